/// Memory manager: the store plus an optional embedding provider.
use std::sync::Arc;

use {
    parlor_common::ids::ConversationId,
    tracing::{debug, warn},
};

use crate::{Result, embeddings::EmbeddingProvider, record::MemoryRecord, store::MemoryStore};

pub struct MemoryManager {
    store: Arc<dyn MemoryStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    dims: usize,
}

impl MemoryManager {
    /// Create a memory manager that embeds inbound text.
    pub fn new(store: Arc<dyn MemoryStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let dims = embedder.dimensions();
        Self {
            store,
            embedder: Some(embedder),
            dims,
        }
    }

    /// Create a memory manager without embeddings. Zero vectors use `dims`.
    pub fn without_embeddings(store: Arc<dyn MemoryStore>, dims: usize) -> Self {
        Self {
            store,
            embedder: None,
            dims,
        }
    }

    pub fn has_embeddings(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    /// Attach an embedding of the record's text.
    ///
    /// Without a provider, or when the provider fails, the record is returned
    /// unchanged.
    pub async fn add_embedding(&self, mut record: MemoryRecord) -> MemoryRecord {
        let Some(ref embedder) = self.embedder else {
            return record;
        };
        if record.content.text.trim().is_empty() {
            return record;
        }
        match embedder.embed(&record.content.text).await {
            Ok(embedding) => {
                debug!(
                    id = %record.id,
                    model = embedder.model_name(),
                    dims = embedding.len(),
                    "embedded memory"
                );
                record.embedding = Some(embedding);
            },
            Err(e) => {
                warn!(id = %record.id, error = %e, "embedding failed, storing without it");
            },
        }
        record
    }

    /// Store a record; see [`MemoryStore::create_record`].
    pub async fn create(&self, record: &MemoryRecord, unique: bool) -> Result<bool> {
        self.store.create_record(record, unique).await
    }

    /// The newest `limit` records of a conversation, oldest first.
    pub async fn recent(
        &self,
        conversation_id: ConversationId,
        limit: u32,
    ) -> Result<Vec<MemoryRecord>> {
        self.store.query_recent(conversation_id, limit).await
    }

    /// All-zero vector of the embedder's dimension.
    pub fn zero_embedding(&self) -> Vec<f32> {
        vec![0.0; self.dims]
    }
}
