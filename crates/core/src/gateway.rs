//! ModelGateway trait — the abstraction over the language-model backend.
//!
//! A gateway sends an ordered message log and returns the assistant's reply
//! plus the token accounting for that exchange. The shape is deliberately
//! minimal: the orchestrator only needs the reply text and the total token
//! count to enforce the per-conversation budget.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::GatewayError;
use crate::message::Message;

/// The assistant's reply to one exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// The generated text.
    pub content: String,

    /// Total tokens consumed by the exchange (prompt + completion), as
    /// reported by the backend. Zero when the backend reports no usage.
    pub total_tokens: u64,
}

/// The model backend boundary.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// A human-readable name for this gateway (e.g., "openai").
    fn name(&self) -> &str;

    /// Send the full ordered message log, get the assistant's reply.
    async fn complete(&self, messages: &[Message]) -> Result<ChatReply, GatewayError>;

    /// Health check — can we reach the backend?
    async fn health_check(&self) -> Result<bool, GatewayError> {
        Ok(true)
    }
}
