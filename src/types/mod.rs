//! Core types for the form relay.
//!
//! Defines the envelopes the relay exchanges with its collaborators: the
//! inbound [`SubmissionRequest`], the outbound [`OutboundMessage`] handed
//! to the mail transport, and the [`Redirect`] outcome returned to the
//! caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::RelayConfig;

/// Redirect status returned for both outcomes.
///
/// The caller expects to forward the user-agent to the destination page;
/// an inline 200 body is explicitly disallowed.
pub const REDIRECT_STATUS: u16 = 301;

/// An inbound form submission as delivered by the HTTP trigger.
///
/// The body arrives base64-encoded; the headers carry at least a
/// content-type identifying the multipart boundary. Header casing is
/// whatever the transport chose, so lookups go through [`header`](Self::header),
/// which matches names case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Base64-encoded request body.
    pub body: String,
    /// Request headers as delivered by the transport.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl SubmissionRequest {
    /// Creates a request from a body and headers.
    pub fn new(body: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self {
            body: body.into(),
            headers,
        }
    }

    /// Creates a request carrying only a content-type header.
    pub fn with_content_type(body: impl Into<String>, content_type: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), content_type.into());
        Self::new(body, headers)
    }

    /// Looks up a header value, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the declared content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// The relay's answer to the caller: where to send the user-agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// HTTP status code; always [`REDIRECT_STATUS`].
    pub status: u16,
    /// Destination URL for the `Location` header.
    pub location: String,
}

impl Redirect {
    /// Creates a redirect to the given destination.
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            status: REDIRECT_STATUS,
            location: location.into(),
        }
    }

    /// Creates the redirect to the configured success page.
    pub fn success(config: &RelayConfig) -> Self {
        Self::to(config.success_url.clone())
    }

    /// Creates the redirect to the configured failure page.
    pub fn failure(config: &RelayConfig) -> Self {
        Self::to(config.failure_url.clone())
    }

    /// Returns the `Location` header this redirect requests.
    pub fn location_header(&self) -> (&'static str, &str) {
        ("Location", &self.location)
    }
}

/// A fully formed raw email message: header block plus MIME body.
///
/// The header must describe the body's boundary and recipients before the
/// two are joined; the pipeline only constructs this once the body writer
/// has been closed, so no partial message ever reaches a transport.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    header: Vec<u8>,
    body: Vec<u8>,
}

impl OutboundMessage {
    /// Creates a message from a composed header block and a closed body.
    pub fn new(header: Vec<u8>, body: Vec<u8>) -> Self {
        Self { header, body }
    }

    /// Returns the header block bytes.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Returns the MIME body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the raw byte sequence handed to the mail transport.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.header.len() + self.body.len());
        raw.extend_from_slice(&self.header);
        raw.extend_from_slice(&self.body);
        raw
    }

    /// Returns the total message size in bytes.
    pub fn len(&self) -> usize {
        self.header.len() + self.body.len()
    }

    /// Returns true if both header and body are empty.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.body.is_empty()
    }
}
