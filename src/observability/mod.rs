//! Observability infrastructure for the form relay.
//!
//! Provides per-process counters and structured log entries. These are the
//! operator-facing side channel; end users only ever see the two redirect
//! destinations.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::RelayErrorKind;

/// Log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level name.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Relay metrics collector.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total submissions received.
    pub submissions_received: AtomicU64,
    /// Submissions relayed to the mail transport successfully.
    pub submissions_delivered: AtomicU64,
    /// Submissions that ended in the failure redirect.
    pub submissions_failed: AtomicU64,
    /// Failures while decoding the request body or boundary.
    pub decode_failures: AtomicU64,
    /// Payloads rejected for not being multipart form data.
    pub format_failures: AtomicU64,
    /// Submissions dropped by the honeypot guard.
    pub spam_rejections: AtomicU64,
    /// Failures while assembling the outbound message.
    pub build_failures: AtomicU64,
    /// Failures reported by the mail transport.
    pub send_failures: AtomicU64,
}

impl RelayMetrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an inbound submission.
    pub fn record_received(&self) {
        self.submissions_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successfully relayed submission.
    pub fn record_delivered(&self) {
        self.submissions_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed submission under its error kind.
    pub fn record_failure(&self, kind: RelayErrorKind) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            RelayErrorKind::Decode => &self.decode_failures,
            RelayErrorKind::Format => &self.format_failures,
            RelayErrorKind::SpamSuspected => &self.spam_rejections,
            RelayErrorKind::Build => &self.build_failures,
            RelayErrorKind::Send => &self.send_failures,
            // Configuration faults never come out of a running pipeline.
            RelayErrorKind::Configuration => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submissions_received: self.submissions_received.load(Ordering::Relaxed),
            submissions_delivered: self.submissions_delivered.load(Ordering::Relaxed),
            submissions_failed: self.submissions_failed.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            format_failures: self.format_failures.load(Ordering::Relaxed),
            spam_rejections: self.spam_rejections.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }

    /// Resets all metrics.
    pub fn reset(&self) {
        self.submissions_received.store(0, Ordering::Relaxed);
        self.submissions_delivered.store(0, Ordering::Relaxed);
        self.submissions_failed.store(0, Ordering::Relaxed);
        self.decode_failures.store(0, Ordering::Relaxed);
        self.format_failures.store(0, Ordering::Relaxed);
        self.spam_rejections.store(0, Ordering::Relaxed);
        self.build_failures.store(0, Ordering::Relaxed);
        self.send_failures.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total submissions received.
    pub submissions_received: u64,
    /// Submissions relayed successfully.
    pub submissions_delivered: u64,
    /// Submissions that ended in the failure redirect.
    pub submissions_failed: u64,
    /// Failures while decoding the request body or boundary.
    pub decode_failures: u64,
    /// Payloads rejected for not being multipart form data.
    pub format_failures: u64,
    /// Submissions dropped by the honeypot guard.
    pub spam_rejections: u64,
    /// Failures while assembling the outbound message.
    pub build_failures: u64,
    /// Failures reported by the mail transport.
    pub send_failures: u64,
}

impl MetricsSnapshot {
    /// Returns the fraction of submissions that were relayed.
    pub fn delivery_rate(&self) -> f64 {
        if self.submissions_received == 0 {
            1.0
        } else {
            self.submissions_delivered as f64 / self.submissions_received as f64
        }
    }

    /// Returns the fraction of submissions dropped as spam.
    pub fn spam_rate(&self) -> f64 {
        if self.submissions_received == 0 {
            0.0
        } else {
            self.spam_rejections as f64 / self.submissions_received as f64
        }
    }
}

/// Per-submission context for diagnostics.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request ID.
    pub request_id: String,
    /// Request body size in bytes, as delivered.
    pub body_size: usize,
    /// Number of text fields decoded from the form.
    pub field_count: usize,
    /// Number of attached files decoded from the form.
    pub attachment_count: usize,
    /// Size of the composed outbound message.
    pub message_size: usize,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            body_size: 0,
            field_count: 0,
            attachment_count: 0,
            message_size: 0,
        }
    }

    /// Sets the request body size.
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = size;
        self
    }

    /// Sets the decoded field count.
    pub fn with_fields(mut self, count: usize) -> Self {
        self.field_count = count;
        self
    }

    /// Sets the decoded attachment count.
    pub fn with_attachments(mut self, count: usize) -> Self {
        self.attachment_count = count;
        self
    }

    /// Sets the composed message size.
    pub fn with_message_size(mut self, size: usize) -> Self {
        self.message_size = size;
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log level.
    pub level: LogLevel,
    /// Message.
    pub message: String,
    /// Entry creation time.
    pub timestamp: DateTime<Utc>,
    /// Request context.
    pub context: Option<RequestContext>,
    /// Additional fields.
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates a new log entry.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            context: None,
            fields: Vec::new(),
        }
    }

    /// Sets the request context.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Adds a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Formats the log entry as JSON.
    pub fn to_json(&self) -> String {
        let mut obj = serde_json::Map::new();
        obj.insert(
            "timestamp".to_string(),
            serde_json::Value::String(self.timestamp.to_rfc3339()),
        );
        obj.insert(
            "level".to_string(),
            serde_json::Value::String(self.level.name().to_string()),
        );
        obj.insert(
            "message".to_string(),
            serde_json::Value::String(self.message.clone()),
        );

        if let Some(ctx) = &self.context {
            obj.insert(
                "request_id".to_string(),
                serde_json::Value::String(ctx.request_id.clone()),
            );
            obj.insert(
                "body_size".to_string(),
                serde_json::Value::Number(ctx.body_size.into()),
            );
            obj.insert(
                "message_size".to_string(),
                serde_json::Value::Number(ctx.message_size.into()),
            );
        }

        for (key, value) in &self.fields {
            obj.insert(key.clone(), serde_json::Value::String(value.clone()));
        }

        serde_json::to_string(&obj).unwrap_or_else(|_| self.message.clone())
    }
}
