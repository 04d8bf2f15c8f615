//! Inbound message processing pipeline, the glue between channels and the
//! model.
//!
//! Flow: gate → resolve image attachment → record inbound → compose state →
//! decide → generate → chunk and deliver → record outbound → refresh state →
//! actions and evaluation.

pub mod attachment;
pub mod chunk;
pub mod decision;
pub mod error;
pub mod generate;
pub mod hooks;
pub mod orchestrator;
pub mod queue;
pub mod recorder;
pub mod runtime;
pub mod state;
pub mod templates;

#[cfg(test)]
mod testing;

pub use {
    chunk::{DEFAULT_MAX_MESSAGE_LEN, OutboundChunk, chunk, split_message},
    decision::{Decision, RespondReason, SkipReason},
    error::{Error, Result},
    generate::ResponseContent,
    hooks::{ActionProcessor, Evaluator, LoggingEvaluator, NoopActions, NoopEvaluator},
    orchestrator::{CycleOutcome, CycleState, MessageOrchestrator},
    queue::ConversationQueue,
    runtime::{AgentIdentity, AgentRuntime, PipelineSettings},
    state::ConversationState,
};
