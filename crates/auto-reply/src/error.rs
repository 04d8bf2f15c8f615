/// Crate-wide result type for pipeline steps.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Memory(#[from] parlor_memory::Error),

    #[error(transparent)]
    Channel(#[from] parlor_channels::Error),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}
