//! One processing cycle per inbound event.
//!
//! ```text
//! Received -> Gated -> Recorded -> StateComposed -> Decided
//!   skip:    Done
//!   respond: Generating -> Delivering -> RecordedOutbound -> StateRefreshed
//!            -> ActionsProcessed -> Evaluated -> Done
//! ```

use std::{fmt, sync::Arc};

use {
    parlor_channels::{ChannelOutbound, GatePolicy, GateRejection, InboundEvent},
    parlor_common::ids::ConversationId,
    tracing::{debug, info, warn},
};

use crate::{
    attachment::resolve_attachment,
    chunk::{DEFAULT_MAX_MESSAGE_LEN, chunk, deliver},
    decision::{Decision, decide},
    generate::generate,
    queue::ConversationQueue,
    recorder::{is_replay, record_inbound, record_outbound},
    runtime::AgentRuntime,
    state::{StateInput, compose, refresh},
};

/// Cycle states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleState {
    Received,
    Gated,
    Recorded,
    StateComposed,
    Decided,
    Generating,
    Delivering,
    RecordedOutbound,
    StateRefreshed,
    ActionsProcessed,
    Evaluated,
    Done,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The gate policy rejected the event.
    Gated(GateRejection),
    /// No text, caption or describable image; nothing stored.
    NoContent,
    /// The event was already stored by an earlier cycle.
    Duplicate,
    RecordFailed,
    StateFailed,
    /// The decision engine declined to answer.
    Skipped(Decision),
    /// Generation failed, timed out or produced nothing.
    NoResponse,
    /// Delivery stopped early; `sent` chunks went out and were recorded.
    DeliveryFailed { sent: usize, planned: usize },
    Completed {
        replies: usize,
        action: Option<String>,
    },
}

impl CycleOutcome {
    /// Last state the cycle reached.
    #[must_use]
    pub fn terminal_state(&self) -> CycleState {
        match self {
            Self::Gated(_) => CycleState::Gated,
            Self::NoContent | Self::Duplicate => CycleState::Recorded,
            // swallowed failures end the cycle at Done
            Self::RecordFailed
            | Self::StateFailed
            | Self::Skipped(_)
            | Self::NoResponse
            | Self::DeliveryFailed { .. }
            | Self::Completed { .. } => CycleState::Done,
        }
    }

    /// Whether the agent sent anything.
    #[must_use]
    pub fn replied(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::DeliveryFailed { sent: 1.., .. }
        )
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gated(r) => write!(f, "gated: {r}"),
            Self::NoContent => f.write_str("no content"),
            Self::Duplicate => f.write_str("duplicate"),
            Self::RecordFailed => f.write_str("record failed"),
            Self::StateFailed => f.write_str("state failed"),
            Self::Skipped(d) => write!(f, "skipped: {d:?}"),
            Self::NoResponse => f.write_str("no response"),
            Self::DeliveryFailed { sent, planned } => {
                write!(f, "delivery failed after {sent}/{planned} chunks")
            },
            Self::Completed { replies, .. } => write!(f, "completed with {replies} replies"),
        }
    }
}

/// Drives cycles for one platform account.
pub struct MessageOrchestrator {
    runtime: Arc<AgentRuntime>,
    outbound: Arc<dyn ChannelOutbound>,
    gate: GatePolicy,
    max_message_len: usize,
    queue: ConversationQueue,
}

impl MessageOrchestrator {
    pub fn new(runtime: Arc<AgentRuntime>, outbound: Arc<dyn ChannelOutbound>) -> Self {
        Self {
            runtime,
            outbound,
            gate: GatePolicy::default(),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            queue: ConversationQueue::new(),
        }
    }

    #[must_use]
    pub fn with_gate(mut self, gate: GatePolicy) -> Self {
        self.gate = gate;
        self
    }

    #[must_use]
    pub fn with_max_message_len(mut self, max_message_len: usize) -> Self {
        self.max_message_len = max_message_len.max(1);
        self
    }

    /// Share a queue between orchestrators that may see the same chats.
    #[must_use]
    pub fn with_queue(mut self, queue: ConversationQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn runtime(&self) -> &Arc<AgentRuntime> {
        &self.runtime
    }

    /// Run one cycle. Never fails; the outcome says where it stopped.
    pub async fn handle(&self, event: InboundEvent) -> CycleOutcome {
        let outcome = self.run(&event).await;
        match &outcome {
            CycleOutcome::Completed { .. } => info!(
                chat_id = %event.chat_id,
                message_id = %event.message_id,
                %outcome,
                "cycle finished"
            ),
            CycleOutcome::RecordFailed
            | CycleOutcome::StateFailed
            | CycleOutcome::DeliveryFailed { .. } => warn!(
                chat_id = %event.chat_id,
                message_id = %event.message_id,
                %outcome,
                "cycle aborted"
            ),
            _ => debug!(
                chat_id = %event.chat_id,
                message_id = %event.message_id,
                %outcome,
                "cycle finished"
            ),
        }
        outcome
    }

    async fn run(&self, event: &InboundEvent) -> CycleOutcome {
        let rt = &*self.runtime;

        if let Err(rejection) = self.gate.check(event) {
            return CycleOutcome::Gated(rejection);
        }

        let conversation_id = ConversationId::for_chat(&event.chat_id, rt.identity.id);
        let _turn = self.queue.lock(conversation_id).await;

        let attachment = resolve_attachment(rt, self.outbound.as_ref(), event).await;
        let text = match (event.text_or_caption(), attachment.as_deref()) {
            (Some(text), Some(image)) => format!("{text} {image}"),
            (Some(text), None) => text.to_string(),
            (None, Some(image)) => image.to_string(),
            (None, None) => return CycleOutcome::NoContent,
        };

        let inbound = match record_inbound(rt, event, &text).await {
            Ok(r) if r.is_new => r.record,
            Ok(r) => {
                if is_replay(rt, &r.record).await {
                    return CycleOutcome::Duplicate;
                }
                r.record
            },
            Err(e) => {
                warn!(message_id = %event.message_id, error = %e, "failed to record inbound message");
                return CycleOutcome::RecordFailed;
            },
        };

        let state = match compose(rt, &inbound, StateInput {
            sender_name: event.sender.name(),
            agent_handle: event.agent_handle.as_deref(),
            attachment: attachment.as_deref(),
        })
        .await
        {
            Ok(s) => s,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "failed to compose state");
                return CycleOutcome::StateFailed;
            },
        };

        let decision = decide(rt, event, &state).await;
        debug!(message_id = %event.message_id, ?decision, "respond decision");
        if !decision.should_respond() {
            return CycleOutcome::Skipped(decision);
        }

        if let Err(e) = self.outbound.send_typing(&event.chat_id).await {
            debug!(chat_id = %event.chat_id, error = %e, "typing indicator failed");
        }

        let Some(response) = generate(rt, &inbound, &state).await else {
            return CycleOutcome::NoResponse;
        };

        let chunks = chunk(
            &response.text,
            self.max_message_len,
            Some(&event.message_id),
        );
        let delivery = deliver(self.outbound.as_ref(), &event.chat_id, &chunks).await;
        let complete = delivery.is_complete();
        if delivery.sent.is_empty() {
            return CycleOutcome::DeliveryFailed {
                sent: 0,
                planned: delivery.planned,
            };
        }

        let outbound = record_outbound(rt, &inbound, &delivery.sent, &response, complete).await;

        let state = match refresh(rt, state.clone()).await {
            Ok(s) => s,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "failed to refresh state");
                state
            },
        };

        if let Err(e) = rt.actions.process(&inbound, &outbound, &state).await {
            warn!(conversation_id = %conversation_id, error = %e, "action processing failed");
        }
        if let Err(e) = rt.evaluator.evaluate(&inbound, &outbound, &state).await {
            warn!(conversation_id = %conversation_id, error = %e, "evaluation failed");
        }

        if complete {
            CycleOutcome::Completed {
                replies: delivery.sent.len(),
                action: response.action,
            }
        } else {
            CycleOutcome::DeliveryFailed {
                sent: delivery.sent.len(),
                planned: delivery.planned,
            }
        }
    }
}
