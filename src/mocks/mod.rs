//! Mock implementations for testing.
//!
//! Provides a recording mail transport and multipart payload builders.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::{Arc, Mutex};

use crate::config::RelayConfig;
use crate::errors::{RelayError, RelayResult};
use crate::transport::MailTransport;
use crate::types::{OutboundMessage, SubmissionRequest};

/// Mock mail transport for testing.
#[derive(Debug)]
pub struct MockTransport {
    /// Messages handed to the transport.
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    /// Simulated failure for the next send.
    fail_next: Arc<Mutex<Option<RelayError>>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(None)),
        }
    }

    /// Sets the next send to fail.
    pub fn fail_next_with(&self, error: RelayError) -> &Self {
        *self.fail_next.lock().unwrap() = Some(error);
        self
    }

    /// Returns the number of messages handed to the transport.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Returns the messages handed to the transport.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Clears recorded messages and programmed failures.
    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        *self.fail_next.lock().unwrap() = None;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send_raw(&self, message: &OutboundMessage) -> RelayResult<()> {
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }

        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Builder for base64-encoded multipart submissions.
///
/// Produces the exact wire shape browsers send: CRLF-delimited parts,
/// `form-data` dispositions, a terminal `--` delimiter, then the whole
/// body base64-encoded into a [`SubmissionRequest`].
#[derive(Debug, Clone)]
pub struct FormPayload {
    boundary: String,
    body: Vec<u8>,
}

impl FormPayload {
    /// Creates an empty payload with the given boundary.
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    /// Returns the payload boundary.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Adds a text field part.
    pub fn text_field(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Adds a file part.
    pub fn file_field(mut self, name: &str, filename: &str, content: &[u8]) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Closes the payload and wraps it into a submission request.
    pub fn into_request(mut self) -> SubmissionRequest {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        SubmissionRequest::with_content_type(
            BASE64.encode(&self.body),
            format!("multipart/form-data; boundary={}", self.boundary),
        )
    }

    fn open_part(&mut self) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}

/// Creates a relay configuration for tests.
pub fn test_config() -> RelayConfig {
    RelayConfig::builder()
        .sender("relay@example.org")
        .recipient("owner@example.org")
        .region("us-west-2")
        .success_url("https://example.org/sent")
        .failure_url("https://example.org/error")
        .build()
        .expect("test configuration is valid")
}

/// Creates a well-formed contact submission.
pub fn contact_request() -> SubmissionRequest {
    FormPayload::new("test-boundary")
        .text_field("name", "Ada Lovelace")
        .text_field("email", "ada@example.org")
        .text_field("message", "Hello from the engine room.")
        .into_request()
}

/// Creates a submission with the honeypot field filled.
pub fn spam_request() -> SubmissionRequest {
    FormPayload::new("test-boundary")
        .text_field("name", "Ada Lovelace")
        .text_field("office", "I am a robot")
        .into_request()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_mock_transport_records_messages() {
        let transport = MockTransport::new();
        let message = OutboundMessage::new(b"Subject: hi\n\n".to_vec(), b"body".to_vec());

        transport.send_raw(&message).await.unwrap();
        transport.send_raw(&message).await.unwrap();

        assert_eq!(transport.sent_count(), 2);
        assert_eq!(transport.sent()[0].to_bytes(), message.to_bytes());
    }

    #[tokio::test]
    async fn test_mock_transport_programmed_failure() {
        let transport = MockTransport::new();
        transport.fail_next_with(RelayError::send("transport unavailable"));
        let message = OutboundMessage::new(Vec::new(), Vec::new());

        assert_err!(transport.send_raw(&message).await);
        // The failure is consumed; the next send goes through.
        assert_ok!(transport.send_raw(&message).await);
        assert_eq!(transport.sent_count(), 1);
    }

    #[test]
    fn test_payload_round_trips_through_decoder() {
        let request = contact_request();
        let form = crate::multipart::FormDecoder::new(1024 * 1024)
            .decode(&request)
            .unwrap();

        assert_eq!(form.joined("name"), "Ada Lovelace");
        assert_eq!(form.joined("email"), "ada@example.org");
        assert_eq!(form.joined("message"), "Hello from the engine room.");
    }

    #[test]
    fn test_file_payload_round_trips_through_decoder() {
        let request = FormPayload::new("bd")
            .file_field("attachment", "notes.txt", b"line one\nline two")
            .into_request();
        let form = crate::multipart::FormDecoder::new(1024 * 1024)
            .decode(&request)
            .unwrap();

        let files = form.files("attachment");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename(), "notes.txt");
        assert_eq!(files[0].open().into_inner(), b"line one\nline two");
    }

    #[test]
    fn test_config_is_valid() {
        let config = test_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.subject, "contact me");
        assert_eq!(config.honeypot_field, "office");
    }
}
