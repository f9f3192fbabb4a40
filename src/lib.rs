//! # Form Relay Library
//!
//! A contact-form relay that turns multipart HTTP submissions into raw
//! MIME email, with:
//! - Base64 request-body and multipart/form-data decoding
//! - Honeypot-based spam screening
//! - Multipart/mixed message construction with typed attachments
//! - Quoted-printable text parts and 76-column base64 attachment parts
//! - A single async transport seam for SES-style raw delivery
//! - Uniform success/failure redirects and built-in metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use formrelay::mocks::MockTransport;
//! use formrelay::{FormRelay, RelayConfig, SubmissionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Configure the relay
//!     let config = RelayConfig::builder()
//!         .sender("forms@example.org")
//!         .recipient("owner@example.org")
//!         .region("us-west-2")
//!         .success_url("https://example.org/sent.html")
//!         .failure_url("https://example.org/error.html")
//!         .build()?;
//!
//!     // In production the transport wraps the embedding mail sender
//!     let relay = FormRelay::new(config, Arc::new(MockTransport::new()))?;
//!
//!     // Hand each inbound submission to the relay
//!     let request = SubmissionRequest::with_content_type(
//!         "<base64-encoded body>",
//!         "multipart/form-data; boundary=...",
//!     );
//!     let redirect = relay.handle(&request).await;
//!     println!("{} -> {}", redirect.status, redirect.location);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Form decoding
pub mod multipart;

// Spam screening
pub mod guard;

// Message assembly
pub mod headers;
pub mod message;

// Transport seam
pub mod transport;

// Observability
pub mod observability;

// Pipeline
pub mod pipeline;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use config::{RelayConfig, RelayConfigBuilder};
pub use errors::{ErrorSeverity, RelayError, RelayErrorKind, RelayResult};
pub use guard::SpamGuard;
pub use headers::compose_header;
pub use message::MessageWriter;
pub use multipart::{DecodedForm, FilePart, FormDecoder};
pub use pipeline::{FormRelay, Stage};
pub use transport::MailTransport;
pub use types::{OutboundMessage, Redirect, SubmissionRequest};
