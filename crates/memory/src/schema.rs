//! Database connection and migration runner.

use std::str::FromStr;

use {
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    },
    tracing::debug,
};

use crate::Result;

/// Run database migrations for the memory system.
///
/// Creates the participant, conversation, memory, log and subscriber tables.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Open (creating if missing) and migrate the database at `path`.
///
/// `:memory:` opens a private in-memory database on a single connection.
pub async fn open_pool(path: &str) -> Result<SqlitePool> {
    let in_memory = path == ":memory:";
    let options = if in_memory {
        SqliteConnectOptions::from_str("sqlite::memory:")?
    } else {
        SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
    };
    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    debug!(path, "memory database ready");
    Ok(pool)
}
