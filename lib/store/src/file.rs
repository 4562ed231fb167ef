use crate::error::StorageError;
use crate::BlobStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A filesystem store with a two-level fan-out:
/// `<root>/<key[0..2]>/<key[2..4]>/<key>`.
///
/// Writes go to a temp file in the target directory and are renamed into
/// place, so concurrent readers never observe a partial entry.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        // Keys are hex fingerprints plus a codec suffix, so byte slicing
        // stays on char boundaries.
        let fan_out = key.len() >= 4;
        let mut path = self.root.clone();
        if fan_out {
            path.push(&key[0..2]);
            path.push(&key[2..4]);
        }
        path.push(key);
        path
    }
}

#[async_trait]
impl BlobStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.entry_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.entry_path(key);
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        fs::create_dir_all(&dir).await?;

        let temp = dir.join(format!(
            ".{key}.{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, bytes).await?;
        match fs::rename(&temp, &path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                Err(e.into())
            }
        }
    }

    async fn purge(&self) -> Result<(), StorageError> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }
}
