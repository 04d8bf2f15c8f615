//! Writing inbound and outbound messages to memory.

use {
    parlor_channels::{InboundEvent, SentMessage},
    parlor_common::ids::{ConversationId, MemoryId, ParticipantId},
    parlor_memory::{Content, MemoryRecord, Participant},
    tracing::{debug, warn},
};

use crate::{Result, generate::ResponseContent, runtime::AgentRuntime};

/// Action stored on every reply chunk except the last one.
pub const CONTINUE_ACTION: &str = "CONTINUE";

#[derive(Debug, Clone)]
pub struct RecordedInbound {
    pub record: MemoryRecord,
    /// `false` when a record with the same ID already existed.
    pub is_new: bool,
}

/// Participant row for the event's sender.
#[must_use]
pub fn sender_participant(runtime: &AgentRuntime, event: &InboundEvent) -> Participant {
    let sender = &event.sender;
    Participant {
        id: ParticipantId::for_user(&sender.user_id, runtime.identity.id),
        platform_user_id: sender.user_id.clone(),
        name: sender
            .display_name
            .clone()
            .or_else(|| sender.username.clone()),
        username: sender.username.clone(),
        source: event.platform.clone(),
    }
}

/// Store the inbound message under its deterministic ID.
///
/// Storing the same platform message twice keeps the first record and
/// reports `is_new = false`.
pub async fn record_inbound(
    runtime: &AgentRuntime,
    event: &InboundEvent,
    text: &str,
) -> Result<RecordedInbound> {
    let agent = runtime.identity.id;
    let participant = sender_participant(runtime, event);
    let conversation_id = ConversationId::for_chat(&event.chat_id, agent);

    runtime
        .memory
        .store()
        .ensure_connection(&participant, conversation_id, &event.chat_id)
        .await?;

    let record = MemoryRecord {
        id: MemoryId::for_message(&event.message_id, agent),
        conversation_id,
        participant_id: participant.id,
        agent_id: agent,
        content: Content {
            text: text.to_string(),
            source: event.platform.clone(),
            in_reply_to: event
                .reply_to_message_id
                .as_deref()
                .map(|id| MemoryId::for_message(id, agent)),
            action: None,
        },
        created_at: event.date * 1000,
        embedding: None,
    };
    let record = runtime.memory.add_embedding(record).await;
    let is_new = runtime.memory.create(&record, true).await?;
    if !is_new {
        debug!(id = %record.id, message_id = %event.message_id, "inbound message already stored");
    }
    Ok(RecordedInbound { record, is_new })
}

/// Whether an already stored record with this ID belongs to the same
/// conversation.
///
/// Platform message IDs are only unique per chat, so an ID hit from another
/// conversation is not a replay. A failed lookup counts as a replay.
pub async fn is_replay(runtime: &AgentRuntime, record: &MemoryRecord) -> bool {
    match runtime.memory.store().get_record(record.id).await {
        Ok(Some(stored)) => stored.conversation_id == record.conversation_id,
        Ok(None) => false,
        Err(e) => {
            warn!(id = %record.id, error = %e, "failed to look up stored record");
            true
        },
    }
}

/// Store one record per delivered chunk.
///
/// Every record but the last gets [`CONTINUE_ACTION`]; the last carries the
/// response's action when `complete`, and `CONTINUE` otherwise. Write failures
/// are logged and the record skipped.
pub async fn record_outbound(
    runtime: &AgentRuntime,
    inbound: &MemoryRecord,
    sent: &[SentMessage],
    response: &ResponseContent,
    complete: bool,
) -> Vec<MemoryRecord> {
    let agent = runtime.identity.id;
    let mut records = Vec::with_capacity(sent.len());

    for (i, message) in sent.iter().enumerate() {
        let is_last = i + 1 == sent.len();
        let action = if is_last && complete {
            response.action.clone()
        } else {
            Some(CONTINUE_ACTION.to_string())
        };
        let record = MemoryRecord {
            id: MemoryId::for_message(&message.message_id, agent),
            conversation_id: inbound.conversation_id,
            participant_id: runtime.identity.participant_id(),
            agent_id: agent,
            content: Content {
                text: message.text.clone(),
                source: inbound.content.source.clone(),
                in_reply_to: Some(inbound.id),
                action,
            },
            created_at: message.date * 1000,
            embedding: Some(runtime.memory.zero_embedding()),
        };
        match runtime.memory.create(&record, true).await {
            Ok(_) => records.push(record),
            Err(e) => {
                warn!(id = %record.id, error = %e, "failed to store outbound record");
            },
        }
    }
    records
}
