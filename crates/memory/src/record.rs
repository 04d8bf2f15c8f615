//! Records persisted by the memory store.

use {
    parlor_common::ids::{AgentId, ConversationId, MemoryId, ParticipantId},
    serde::{Deserialize, Serialize},
};

/// Body of a memory record, stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub text: String,
    /// Platform the message came from, e.g. `telegram`.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MemoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// One message remembered in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub conversation_id: ConversationId,
    /// Author of the message. For agent replies this is the agent's own
    /// participant ID.
    pub participant_id: ParticipantId,
    pub agent_id: AgentId,
    pub content: Content,
    /// Unix milliseconds.
    pub created_at: i64,
    pub embedding: Option<Vec<f32>>,
}

/// A known speaker in some conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub platform_user_id: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub source: String,
}

impl Participant {
    /// Name to show in prompts.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.platform_user_id)
    }
}

/// Audit entry, kept apart from conversational memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub participant_id: ParticipantId,
    pub conversation_id: ConversationId,
    /// Entry kind, e.g. `response`.
    #[serde(rename = "type")]
    pub kind: String,
    pub body: serde_json::Value,
    /// Unix milliseconds.
    pub created_at: i64,
}
