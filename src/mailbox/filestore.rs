use super::traits::{Mailbox, MailboxError, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-backed mailbox: one file per key under a base directory.
///
/// Records survive process death; `take` removes the file before returning
/// its contents so a crash between read and action replays at most once.
pub struct FileMailbox {
    base_path: PathBuf,
}

impl FileMailbox {
    pub async fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let base_path = path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn sanitize_filename(key: &str) -> String {
        key.replace(|c: char| !c.is_alphanumeric() && c != '.' && c != '-', "_")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(Self::sanitize_filename(key))
    }

    async fn remove_if_present(path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .or_else(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(e)
                }
            })
            .map_err(MailboxError::from)
    }
}

#[async_trait]
impl Mailbox for FileMailbox {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        fs::write(self.path_for(key), value)
            .await
            .map_err(MailboxError::from)
    }

    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(data) => {
                Self::remove_if_present(&path).await?;
                Ok(Some(data))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MailboxError::Io(e)),
        }
    }
}
