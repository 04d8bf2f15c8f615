/// SQLite implementation of the `MemoryStore` trait.
use async_trait::async_trait;
use {
    parlor_common::{
        ids::{ConversationId, MemoryId},
        now_ms,
    },
    sqlx::SqlitePool,
};

use crate::{
    Result,
    error::Context,
    record::{Content, LogEntry, MemoryRecord, Participant},
    store::MemoryStore,
};

pub struct SqliteMemoryStore {
    pool: SqlitePool,
}

impl SqliteMemoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Deserialize a BLOB of little-endian f32s.
pub(crate) fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Serialize a slice of f32s to a BLOB of little-endian bytes.
pub(crate) fn vec_to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

type MemoryRow = (String, String, String, String, String, i64, Option<Vec<u8>>);

const MEMORY_COLUMNS: &str =
    "id, conversation_id, participant_id, agent_id, content, created_at, embedding";

fn row_to_record(
    (id, conversation_id, participant_id, agent_id, content, created_at, embedding): MemoryRow,
) -> Result<MemoryRecord> {
    Ok(MemoryRecord {
        id: id.parse()?,
        conversation_id: conversation_id.parse()?,
        participant_id: participant_id.parse()?,
        agent_id: agent_id.parse()?,
        content: serde_json::from_str::<Content>(&content)
            .with_context(|| format!("decoding content of memory {id}"))?,
        created_at,
        embedding: embedding.as_deref().map(blob_to_vec),
    })
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn ensure_connection(
        &self,
        participant: &Participant,
        conversation_id: ConversationId,
        platform_chat_id: &str,
    ) -> Result<()> {
        let now = now_ms();
        sqlx::query(
            "INSERT INTO participants (id, platform_user_id, name, username, source, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               name=COALESCE(excluded.name, participants.name),
               username=COALESCE(excluded.username, participants.username)",
        )
        .bind(participant.id.to_string())
        .bind(&participant.platform_user_id)
        .bind(&participant.name)
        .bind(&participant.username)
        .bind(&participant.source)
        .bind(now)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO conversations (id, platform_chat_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(conversation_id.to_string())
        .bind(platform_chat_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO conversation_participants (conversation_id, participant_id)
             VALUES (?, ?)",
        )
        .bind(conversation_id.to_string())
        .bind(participant.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_record(&self, record: &MemoryRecord, unique: bool) -> Result<bool> {
        let sql = if unique {
            "INSERT OR IGNORE INTO memories
               (id, conversation_id, participant_id, agent_id, content, created_at, embedding)
             VALUES (?, ?, ?, ?, ?, ?, ?)"
        } else {
            "INSERT INTO memories
               (id, conversation_id, participant_id, agent_id, content, created_at, embedding)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               content=excluded.content, embedding=excluded.embedding"
        };
        let content = serde_json::to_string(&record.content)?;
        let result = sqlx::query(sql)
            .bind(record.id.to_string())
            .bind(record.conversation_id.to_string())
            .bind(record.participant_id.to_string())
            .bind(record.agent_id.to_string())
            .bind(content)
            .bind(record.created_at)
            .bind(record.embedding.as_deref().map(vec_to_blob))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_record(&self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        let row: Option<MemoryRow> =
            sqlx::query_as(&format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(row_to_record).transpose()
    }

    async fn query_recent(
        &self,
        conversation_id: ConversationId,
        limit: u32,
    ) -> Result<Vec<MemoryRecord>> {
        let rows: Vec<MemoryRow> = sqlx::query_as(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE conversation_id = ?
             ORDER BY created_at DESC, rowid DESC LIMIT ?"
        ))
        .bind(conversation_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        let mut records = rows
            .into_iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>>>()?;
        records.reverse();
        Ok(records)
    }

    async fn count_records(&self, conversation_id: ConversationId) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT count(*) FROM memories WHERE conversation_id = ?")
            .bind(conversation_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(row.0).unwrap_or_default())
    }

    async fn participants(&self, conversation_id: ConversationId) -> Result<Vec<Participant>> {
        let rows: Vec<(String, String, Option<String>, Option<String>, String)> = sqlx::query_as(
            "SELECT p.id, p.platform_user_id, p.name, p.username, p.source
             FROM participants p
             JOIN conversation_participants cp ON cp.participant_id = p.id
             WHERE cp.conversation_id = ?
             ORDER BY p.created_at, p.id",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(id, platform_user_id, name, username, source)| {
                Ok(Participant {
                    id: id.parse()?,
                    platform_user_id,
                    name,
                    username,
                    source,
                })
            })
            .collect()
    }

    async fn log(&self, entry: &LogEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO logs (id, participant_id, conversation_id, type, body, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(MemoryId::generate().to_string())
        .bind(entry.participant_id.to_string())
        .bind(entry.conversation_id.to_string())
        .bind(&entry.kind)
        .bind(serde_json::to_string(&entry.body)?)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn logs(&self, conversation_id: ConversationId) -> Result<Vec<LogEntry>> {
        let rows: Vec<(String, String, String, String, i64)> = sqlx::query_as(
            "SELECT participant_id, conversation_id, type, body, created_at FROM logs
             WHERE conversation_id = ? ORDER BY created_at, rowid",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(participant_id, conversation_id, kind, body, created_at)| {
                let body = serde_json::from_str(&body)
                    .with_context(|| format!("decoding body of {kind} log entry"))?;
                Ok(LogEntry {
                    participant_id: participant_id.parse()?,
                    conversation_id: conversation_id.parse()?,
                    kind,
                    body,
                    created_at,
                })
            })
            .collect()
    }
}
