//! Per-conversation serialization of processing cycles.

use std::sync::Arc;

use {
    dashmap::DashMap,
    parlor_common::ids::ConversationId,
    tokio::sync::{Mutex, OwnedMutexGuard},
};

/// One lock per conversation. Cycles in the same conversation run one at a
/// time, in lock-acquisition order; different conversations run concurrently.
#[derive(Clone, Default)]
pub struct ConversationQueue {
    locks: Arc<DashMap<ConversationId, Arc<Mutex<()>>>>,
}

/// Held for the length of a cycle. Dropping the last turn of a conversation
/// removes its lock from the queue.
pub struct ConversationTurn {
    guard: Option<OwnedMutexGuard<()>>,
    conversation_id: ConversationId,
    locks: Arc<DashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl Drop for ConversationTurn {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: nobody holds or waits on it.
        self.locks
            .remove_if(&self.conversation_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl ConversationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the conversation's turn.
    pub async fn lock(&self, conversation_id: ConversationId) -> ConversationTurn {
        let lock = self
            .locks
            .entry(conversation_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ConversationTurn {
            guard: Some(lock.lock_owned().await),
            conversation_id,
            locks: Arc::clone(&self.locks),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
