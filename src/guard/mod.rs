//! Honeypot spam guard.
//!
//! The originating page renders one extra field, hidden from human users
//! by presentation styling. Humans leave it empty; form-filling bots do
//! not. A submission with anything in that field is rejected before any
//! outbound message is constructed, and the rejection is indistinguishable
//! from every other failure in the caller-visible outcome.

use crate::errors::{RelayError, RelayResult};
use crate::multipart::DecodedForm;

/// Rejects submissions whose honeypot field carries a value.
#[derive(Debug, Clone)]
pub struct SpamGuard {
    field: String,
}

impl SpamGuard {
    /// Creates a guard watching the given field name.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Returns the watched field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Checks a decoded form, rejecting suspected automated submissions.
    pub fn check(&self, form: &DecodedForm) -> RelayResult<()> {
        if form.joined(&self.field).is_empty() {
            Ok(())
        } else {
            Err(RelayError::spam(format!(
                "honeypot field {:?} carries a value",
                self.field
            )))
        }
    }
}
