//! Outbound side of the messaging gateway.
//!
//! Transport, authentication and inbound delivery live outside the engine;
//! the engine only needs somewhere to put text.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Send failed: {0}")]
    Send(String),
    #[error("Gateway closed")]
    Closed,
}

/// One message the engine wants delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub conversation_id: i64,
    pub thread_id: Option<i64>,
    /// Sequence id of the message being answered, if any.
    pub reply_to_sequence: Option<i64>,
    pub text: String,
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), GatewayError>;
}
