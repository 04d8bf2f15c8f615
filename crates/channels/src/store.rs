use {anyhow::Result, async_trait::async_trait, serde::Serialize};

/// A chat that opted in to broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscriber {
    pub chat_id: String,
    pub username: Option<String>,
    /// Unix milliseconds.
    pub created_at: i64,
}

/// Persistent subscriber list.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Add a subscriber. Returns `false` if the chat was already subscribed.
    async fn add(&self, subscriber: Subscriber) -> Result<bool>;
    /// Remove a subscriber. Returns `false` if the chat was not subscribed.
    async fn remove(&self, chat_id: &str) -> Result<bool>;
    async fn list(&self) -> Result<Vec<Subscriber>>;
}
