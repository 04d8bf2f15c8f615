/// SQLite-backed subscriber list.
use {
    async_trait::async_trait,
    parlor_channels::{Subscriber, SubscriberStore},
    sqlx::SqlitePool,
};

pub struct SqliteSubscriberStore {
    pool: SqlitePool,
}

impl SqliteSubscriberStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberStore for SqliteSubscriberStore {
    async fn add(&self, subscriber: Subscriber) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO subscribers (chat_id, username, created_at) VALUES (?, ?, ?)",
        )
        .bind(&subscriber.chat_id)
        .bind(&subscriber.username)
        .bind(subscriber.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, chat_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM subscribers WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> anyhow::Result<Vec<Subscriber>> {
        let rows: Vec<(String, Option<String>, i64)> = sqlx::query_as(
            "SELECT chat_id, username, created_at FROM subscribers ORDER BY created_at, chat_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(chat_id, username, created_at)| Subscriber {
                chat_id,
                username,
                created_at,
            })
            .collect())
    }
}
