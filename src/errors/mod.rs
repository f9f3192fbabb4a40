//! Error types for the form relay.
//!
//! Provides the pipeline's failure taxonomy with severity classification
//! and request-fault detection. Every kind collapses to the same uniform
//! failure redirect at the pipeline boundary; the distinctions exist for
//! the logging side channel only.

use std::fmt;
use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Relay error kinds categorizing different failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayErrorKind {
    /// Request body was not valid base64, a part was malformed, or the
    /// parse budget was exceeded.
    Decode,
    /// Content-type was missing, unparseable, or not multipart.
    Format,
    /// Honeypot field carried a value.
    SpamSuspected,
    /// Writing or encoding the outbound message failed.
    Build,
    /// The mail transport rejected or failed to deliver the message.
    Send,
    /// Configuration is invalid.
    Configuration,
}

impl RelayErrorKind {
    /// Returns true if the failure originates in the inbound request
    /// rather than in this service or its transport.
    pub fn is_request_fault(&self) -> bool {
        matches!(
            self,
            RelayErrorKind::Decode | RelayErrorKind::Format | RelayErrorKind::SpamSuspected
        )
    }

    /// Returns the severity level of this error kind.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Critical - requires attention before any submission can succeed
            RelayErrorKind::Configuration => ErrorSeverity::Critical,

            // Error - this submission was lost
            RelayErrorKind::Build | RelayErrorKind::Send => ErrorSeverity::Error,

            // Warning - bad input, nothing to fix on our side
            RelayErrorKind::Decode | RelayErrorKind::Format => ErrorSeverity::Warning,

            // Info - the guard doing its job
            RelayErrorKind::SpamSuspected => ErrorSeverity::Info,
        }
    }
}

impl fmt::Display for RelayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayErrorKind::Decode => write!(f, "Decode failed"),
            RelayErrorKind::Format => write!(f, "Unsupported payload format"),
            RelayErrorKind::SpamSuspected => write!(f, "Spam suspected"),
            RelayErrorKind::Build => write!(f, "Message build failed"),
            RelayErrorKind::Send => write!(f, "Send failed"),
            RelayErrorKind::Configuration => write!(f, "Invalid configuration"),
        }
    }
}

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational - expected scenario.
    Info,
    /// Warning - bad input, no operator action needed.
    Warning,
    /// Error - a submission was lost.
    Error,
    /// Critical - requires immediate attention.
    Critical,
}

/// Relay error with detailed information.
#[derive(Error, Debug)]
pub struct RelayError {
    /// Error kind.
    kind: RelayErrorKind,
    /// Human-readable message.
    message: String,
    /// Underlying cause.
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RelayError {
    /// Creates a new relay error.
    pub fn new(kind: RelayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Sets the underlying cause.
    pub fn with_cause<E: std::error::Error + Send + Sync + 'static>(mut self, cause: E) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> RelayErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if the failure originates in the inbound request.
    pub fn is_request_fault(&self) -> bool {
        self.kind.is_request_fault()
    }

    /// Returns the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        self.kind.severity()
    }

    // Convenience constructors

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Decode, message)
    }

    /// Creates a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Format, message)
    }

    /// Creates a spam-suspected error.
    pub fn spam(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::SpamSuspected, message)
    }

    /// Creates a build error.
    pub fn build(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Build, message)
    }

    /// Creates a send error.
    pub fn send(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Send, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Configuration, message)
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::build("I/O failure while writing message").with_cause(err)
    }
}
