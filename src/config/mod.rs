//! Configuration types for the form relay.
//!
//! Provides one explicit, immutable configuration object with a builder:
//! - Mail addressing (sender, recipient, subject, charset)
//! - Mail-transport region/identity
//! - Redirect destinations for the two outcomes
//! - Form field conventions (honeypot and attachment field names)
//! - Multipart parse budget
//!
//! The pipeline takes the finished [`RelayConfig`] at startup; nothing in
//! the crate reads ambient constants or environment state at request time.

use serde::{Deserialize, Serialize};

use crate::errors::{RelayError, RelayResult};

/// Default subject line for relayed submissions.
pub const DEFAULT_SUBJECT: &str = "contact me";

/// Default character set declared in the text part.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Default honeypot field name.
pub const DEFAULT_HONEYPOT_FIELD: &str = "office";

/// Default attachment field name.
pub const DEFAULT_ATTACHMENT_FIELD: &str = "attachment";

/// Default in-memory parse budget for decoded form content (16 MiB).
pub const DEFAULT_PARSE_BUDGET: usize = 16 * 1024 * 1024;

/// Form relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Sender address for the outbound message.
    pub sender: String,
    /// Recipient address for the outbound message.
    pub recipient: String,
    /// Subject line for the outbound message.
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Character set declared in the text part.
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Region/identity for the embedding mail transport.
    pub region: String,
    /// Redirect destination after a successful relay.
    pub success_url: String,
    /// Redirect destination after any failure.
    pub failure_url: String,
    /// Name of the hidden honeypot field.
    #[serde(default = "default_honeypot_field")]
    pub honeypot_field: String,
    /// Name of the file-upload field.
    #[serde(default = "default_attachment_field")]
    pub attachment_field: String,
    /// Upper bound on total decoded form content held in memory.
    #[serde(default = "default_parse_budget")]
    pub parse_budget: usize,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}
fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}
fn default_honeypot_field() -> String {
    DEFAULT_HONEYPOT_FIELD.to_string()
}
fn default_attachment_field() -> String {
    DEFAULT_ATTACHMENT_FIELD.to_string()
}
fn default_parse_budget() -> usize {
    DEFAULT_PARSE_BUDGET
}

impl RelayConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RelayResult<()> {
        validate_address(&self.sender, "sender")?;
        validate_address(&self.recipient, "recipient")?;

        validate_redirect_url(&self.success_url, "success_url")?;
        validate_redirect_url(&self.failure_url, "failure_url")?;

        if self.subject.is_empty() {
            return Err(RelayError::configuration("subject must not be empty"));
        }

        if self.charset.is_empty() {
            return Err(RelayError::configuration("charset must not be empty"));
        }

        if self.region.is_empty() {
            return Err(RelayError::configuration("region is required"));
        }

        if self.honeypot_field.is_empty() {
            return Err(RelayError::configuration(
                "honeypot_field must not be empty",
            ));
        }

        if self.attachment_field.is_empty() {
            return Err(RelayError::configuration(
                "attachment_field must not be empty",
            ));
        }

        if self.parse_budget == 0 {
            return Err(RelayError::configuration("parse_budget must be positive"));
        }

        Ok(())
    }
}

fn validate_address(address: &str, field: &str) -> RelayResult<()> {
    if address.is_empty() {
        return Err(RelayError::configuration(format!("{field} is required")));
    }
    let at_count = address.chars().filter(|&c| c == '@').count();
    if at_count != 1 || address.starts_with('@') || address.ends_with('@') {
        return Err(RelayError::configuration(format!(
            "{field} is not a valid address: {address}"
        )));
    }
    if address.chars().any(|c| c.is_control() || c == ' ') {
        return Err(RelayError::configuration(format!(
            "{field} contains invalid characters"
        )));
    }
    Ok(())
}

fn validate_redirect_url(url: &str, field: &str) -> RelayResult<()> {
    if url.is_empty() {
        return Err(RelayError::configuration(format!("{field} is required")));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(RelayError::configuration(format!(
            "{field} must be an absolute http(s) URL: {url}"
        )));
    }
    Ok(())
}

/// Builder for relay configuration.
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
    sender: Option<String>,
    recipient: Option<String>,
    subject: Option<String>,
    charset: Option<String>,
    region: Option<String>,
    success_url: Option<String>,
    failure_url: Option<String>,
    honeypot_field: Option<String>,
    attachment_field: Option<String>,
    parse_budget: usize,
}

impl RelayConfigBuilder {
    /// Sets the sender address.
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Sets the recipient address.
    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Sets the subject line.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the declared character set.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the mail-transport region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the success redirect destination.
    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = Some(url.into());
        self
    }

    /// Sets the failure redirect destination.
    pub fn failure_url(mut self, url: impl Into<String>) -> Self {
        self.failure_url = Some(url.into());
        self
    }

    /// Sets the honeypot field name.
    pub fn honeypot_field(mut self, name: impl Into<String>) -> Self {
        self.honeypot_field = Some(name.into());
        self
    }

    /// Sets the attachment field name.
    pub fn attachment_field(mut self, name: impl Into<String>) -> Self {
        self.attachment_field = Some(name.into());
        self
    }

    /// Sets the in-memory parse budget.
    pub fn parse_budget(mut self, bytes: usize) -> Self {
        self.parse_budget = bytes;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> RelayResult<RelayConfig> {
        let config = RelayConfig {
            sender: self
                .sender
                .ok_or_else(|| RelayError::configuration("sender is required"))?,
            recipient: self
                .recipient
                .ok_or_else(|| RelayError::configuration("recipient is required"))?,
            subject: self.subject.unwrap_or_else(default_subject),
            charset: self.charset.unwrap_or_else(default_charset),
            region: self
                .region
                .ok_or_else(|| RelayError::configuration("region is required"))?,
            success_url: self
                .success_url
                .ok_or_else(|| RelayError::configuration("success_url is required"))?,
            failure_url: self
                .failure_url
                .ok_or_else(|| RelayError::configuration("failure_url is required"))?,
            honeypot_field: self.honeypot_field.unwrap_or_else(default_honeypot_field),
            attachment_field: self
                .attachment_field
                .unwrap_or_else(default_attachment_field),
            parse_budget: if self.parse_budget == 0 {
                DEFAULT_PARSE_BUDGET
            } else {
                self.parse_budget
            },
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_with_required() -> RelayConfigBuilder {
        RelayConfig::builder()
            .sender("forms@example.com")
            .recipient("inbox@example.com")
            .region("us-west-2")
            .success_url("https://example.com/thanks")
            .failure_url("https://example.com/sorry")
    }

    #[test]
    fn test_config_builder() {
        let config = builder_with_required()
            .subject("portfolio inquiry")
            .parse_budget(1024)
            .build()
            .unwrap();

        assert_eq!(config.sender, "forms@example.com");
        assert_eq!(config.recipient, "inbox@example.com");
        assert_eq!(config.subject, "portfolio inquiry");
        assert_eq!(config.parse_budget, 1024);
    }

    #[test]
    fn test_config_defaults() {
        let config = builder_with_required().build().unwrap();

        assert_eq!(config.subject, DEFAULT_SUBJECT);
        assert_eq!(config.charset, DEFAULT_CHARSET);
        assert_eq!(config.honeypot_field, DEFAULT_HONEYPOT_FIELD);
        assert_eq!(config.attachment_field, DEFAULT_ATTACHMENT_FIELD);
        assert_eq!(config.parse_budget, DEFAULT_PARSE_BUDGET);
    }

    #[test]
    fn test_config_validation() {
        // Missing sender
        let result = RelayConfig::builder()
            .recipient("inbox@example.com")
            .region("us-west-2")
            .success_url("https://example.com/thanks")
            .failure_url("https://example.com/sorry")
            .build();
        assert!(result.is_err());

        // Malformed recipient
        let result = builder_with_required().recipient("not-an-address").build();
        assert!(result.is_err());

        // Relative redirect URL
        let result = builder_with_required().success_url("/thanks").build();
        assert!(result.is_err());

        // Empty honeypot field name
        let result = builder_with_required().honeypot_field("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_serde_defaults() {
        let json = r#"{
            "sender": "forms@example.com",
            "recipient": "inbox@example.com",
            "region": "us-west-2",
            "success_url": "https://example.com/thanks",
            "failure_url": "https://example.com/sorry"
        }"#;
        let config: RelayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.subject, DEFAULT_SUBJECT);
        assert_eq!(config.parse_budget, DEFAULT_PARSE_BUDGET);
        assert!(config.validate().is_ok());
    }
}
