//! Shared types, error definitions, and utilities used across all parlor crates.

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, FromMessage, Result};

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
