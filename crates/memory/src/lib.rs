//! Conversational memory: records, SQLite persistence, embeddings.

pub mod embeddings;
pub mod embeddings_openai;
pub mod error;
pub mod manager;
pub mod record;
pub mod schema;
pub mod store;
pub mod store_sqlite;
pub mod subscribers;

pub use {
    error::{Error, Result},
    manager::MemoryManager,
    record::{Content, LogEntry, MemoryRecord, Participant},
    schema::{open_pool, run_migrations},
    store::MemoryStore,
    store_sqlite::SqliteMemoryStore,
    subscribers::SqliteSubscriberStore,
};
