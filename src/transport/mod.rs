//! Transport seam for outbound mail delivery.
//!
//! The relay hands the finished message to an embedding-provided sender
//! (an SES-style raw-send API in production). Everything up to that point
//! is synchronous; the single send is the only awaited operation.

use async_trait::async_trait;
use std::fmt;

use crate::errors::RelayResult;
use crate::types::OutboundMessage;

/// Trait for outbound mail delivery.
///
/// Implementations take the raw header-plus-body byte sequence and either
/// deliver it or report the failure. The relay awaits `send_raw` at most
/// once per submission and maps any error to the failure redirect.
#[async_trait]
pub trait MailTransport: Send + Sync + fmt::Debug {
    /// Sends one raw message.
    async fn send_raw(&self, message: &OutboundMessage) -> RelayResult<()>;
}
