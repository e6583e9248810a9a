use super::traits::{Mailbox, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory mailbox for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryMailbox {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-destructive existence check, for assertions.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }
}

#[async_trait]
impl Mailbox for MemoryMailbox {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.remove(key))
    }
}
