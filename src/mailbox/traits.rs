use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, MailboxError>;

/// Durable key-value storage that survives process death.
///
/// The mailbox hands a decision made in an execution context with no live
/// call-handling code (an OS-level notification action) to the next cold
/// start. Every key follows a write-once-read-once-delete discipline:
/// [`Mailbox::take`] deletes the record before the caller acts on it, so a
/// crash mid-consumption replays at most once.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Store a value under `key`, replacing any existing value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Read and delete the value under `key` in one step.
    /// Returns `None` when no record exists.
    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>>;
}
