//! Submission pipeline.
//!
//! Drives one form submission through decode, honeypot inspection, message
//! assembly, and dispatch. Every invocation resolves to exactly one of the
//! two configured redirects; the first stage error wins and maps to the
//! failure page with no detail leaking to the caller.

use std::fmt;
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::errors::RelayResult;
use crate::guard::SpamGuard;
use crate::headers::compose_header;
use crate::message::MessageWriter;
use crate::multipart::{DecodedForm, FormDecoder};
use crate::observability::{RelayMetrics, RequestContext};
use crate::transport::MailTransport;
use crate::types::{OutboundMessage, Redirect, SubmissionRequest};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Base64 decode and multipart parse of the request body.
    Decode,
    /// Honeypot inspection of the decoded form.
    Guard,
    /// Outbound message assembly.
    Build,
    /// Hand-off to the mail transport.
    Send,
}

impl Stage {
    /// Returns the stage name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Guard => "guard",
            Stage::Build => "build",
            Stage::Send => "send",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The form relay.
///
/// Holds only shared immutable state, so one instance can serve any number
/// of concurrent submissions from isolated tasks.
#[derive(Debug)]
pub struct FormRelay {
    /// Configuration.
    config: Arc<RelayConfig>,
    /// Outbound mail transport.
    transport: Arc<dyn MailTransport>,
    /// Metrics collector.
    metrics: Arc<RelayMetrics>,
}

impl FormRelay {
    /// Creates a relay from a configuration and a transport.
    ///
    /// The configuration is validated here; a relay never exists with an
    /// unusable one.
    pub fn new(config: RelayConfig, transport: Arc<dyn MailTransport>) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            transport,
            metrics: Arc::new(RelayMetrics::new()),
        })
    }

    /// Returns the relay configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Returns the metrics collector.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Handles one submission.
    ///
    /// Resolves to the success redirect when the message was handed to the
    /// transport, and to the failure redirect on any error. At most one
    /// send is attempted.
    pub async fn handle(&self, request: &SubmissionRequest) -> Redirect {
        self.metrics.record_received();
        let mut context = RequestContext::new().with_body_size(request.body.len());

        match self.relay(request, &mut context).await {
            Ok(()) => {
                self.metrics.record_delivered();
                #[cfg(feature = "tracing")]
                tracing::info!(
                    request_id = %context.request_id,
                    message_size = context.message_size,
                    "Submission relayed"
                );
                Redirect::success(&self.config)
            }
            Err(err) => {
                self.metrics.record_failure(err.kind());
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    request_id = %context.request_id,
                    kind = %err.kind(),
                    error = %err,
                    "Submission not relayed"
                );
                Redirect::failure(&self.config)
            }
        }
    }

    /// Runs the fallible stages in order.
    async fn relay(
        &self,
        request: &SubmissionRequest,
        context: &mut RequestContext,
    ) -> RelayResult<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(request_id = %context.request_id, stage = %Stage::Decode, "Decoding submission");
        let form = FormDecoder::new(self.config.parse_budget).decode(request)?;
        context.field_count = form.value_count();
        context.attachment_count = form.file_count();

        #[cfg(feature = "tracing")]
        tracing::debug!(request_id = %context.request_id, stage = %Stage::Guard, "Inspecting honeypot");
        SpamGuard::new(self.config.honeypot_field.clone()).check(&form)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(request_id = %context.request_id, stage = %Stage::Build, "Assembling message");
        let message = self.build(&form)?;
        context.message_size = message.len();

        #[cfg(feature = "tracing")]
        tracing::debug!(request_id = %context.request_id, stage = %Stage::Send, "Dispatching message");
        self.transport.send_raw(&message).await
    }

    /// Assembles the outbound message for a decoded form.
    fn build(&self, form: &DecodedForm) -> RelayResult<OutboundMessage> {
        let mut writer = MessageWriter::new(Vec::new(), &self.config.charset);
        writer.write_text_part(form)?;
        for file in form.files(&self.config.attachment_field) {
            writer.write_attachment(file)?;
        }

        let boundary = writer.boundary().to_string();
        let body = writer.close()?;
        let header = compose_header(&self.config, &boundary);
        Ok(OutboundMessage::new(header.into_bytes(), body))
    }
}
