use {
    async_trait::async_trait,
    parlor_common::ids::{ConversationId, MemoryId},
};

use crate::{
    Result,
    record::{LogEntry, MemoryRecord, Participant},
};

/// Persistence for conversational memory.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Make sure the participant and conversation exist and are linked.
    /// Rows are created on first sight and never deleted.
    async fn ensure_connection(
        &self,
        participant: &Participant,
        conversation_id: ConversationId,
        platform_chat_id: &str,
    ) -> Result<()>;

    /// Store a record. With `unique`, an existing record with the same ID is
    /// left untouched and `false` is returned; otherwise it is replaced.
    async fn create_record(&self, record: &MemoryRecord, unique: bool) -> Result<bool>;

    async fn get_record(&self, id: MemoryId) -> Result<Option<MemoryRecord>>;

    /// The newest `limit` records of a conversation, oldest first.
    async fn query_recent(
        &self,
        conversation_id: ConversationId,
        limit: u32,
    ) -> Result<Vec<MemoryRecord>>;

    async fn count_records(&self, conversation_id: ConversationId) -> Result<u64>;

    /// Participants linked to a conversation.
    async fn participants(&self, conversation_id: ConversationId) -> Result<Vec<Participant>>;

    /// Append an audit entry.
    async fn log(&self, entry: &LogEntry) -> Result<()>;

    /// Audit entries of a conversation, oldest first.
    async fn logs(&self, conversation_id: ConversationId) -> Result<Vec<LogEntry>>;
}
