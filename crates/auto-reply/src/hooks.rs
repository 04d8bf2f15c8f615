//! Post-delivery hooks: action processing and evaluation.

use {
    async_trait::async_trait,
    parlor_memory::MemoryRecord,
    tracing::info,
};

use crate::state::ConversationState;

/// Executes the action a reply asked for.
#[async_trait]
pub trait ActionProcessor: Send + Sync {
    /// Action names offered to the model in the reply prompt.
    fn action_names(&self) -> Vec<String> {
        Vec::new()
    }

    async fn process(
        &self,
        inbound: &MemoryRecord,
        outbound: &[MemoryRecord],
        state: &ConversationState,
    ) -> anyhow::Result<()>;
}

/// Inspects a finished exchange.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        inbound: &MemoryRecord,
        outbound: &[MemoryRecord],
        state: &ConversationState,
    ) -> anyhow::Result<()>;
}

pub struct NoopActions;

#[async_trait]
impl ActionProcessor for NoopActions {
    async fn process(
        &self,
        _inbound: &MemoryRecord,
        _outbound: &[MemoryRecord],
        _state: &ConversationState,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct NoopEvaluator;

#[async_trait]
impl Evaluator for NoopEvaluator {
    async fn evaluate(
        &self,
        _inbound: &MemoryRecord,
        _outbound: &[MemoryRecord],
        _state: &ConversationState,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Logs a one-line summary of every exchange.
pub struct LoggingEvaluator;

#[async_trait]
impl Evaluator for LoggingEvaluator {
    async fn evaluate(
        &self,
        inbound: &MemoryRecord,
        outbound: &[MemoryRecord],
        state: &ConversationState,
    ) -> anyhow::Result<()> {
        let action = outbound
            .last()
            .and_then(|r| r.content.action.as_deref())
            .unwrap_or("none");
        info!(
            conversation_id = %inbound.conversation_id,
            inbound_id = %inbound.id,
            replies = outbound.len(),
            action,
            history = state.recent_messages.len(),
            "exchange complete"
        );
        Ok(())
    }
}
