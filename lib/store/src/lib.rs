//! Cache stores for sparql-proxy.
//!
//! A [BlobStore] moves opaque bytes; the [Cache] wrapper owns the shared
//! serialization and compression logic so individual stores never look
//! inside a value.

use async_trait::async_trait;
use std::str::FromStr;

mod compressor;
mod entry;
mod error;
mod file;
mod memory;
mod null;

pub use compressor::{Compressor, UnknownCompressor};
pub use entry::CacheEntry;
pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use null::NullStore;

/// A keyed byte-blob store.
///
/// `get` returning `Ok(None)` means the key is absent; any `Err` is a real
/// failure that callers decide how to tolerate.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
    async fn purge(&self) -> Result<(), StorageError>;
}

/// The store variants selectable through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Null,
    Memory,
    File,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown cache store '{0}', expected 'null', 'memory' or 'file'")]
pub struct UnknownStoreKind(String);

impl FromStr for StoreKind {
    type Err = UnknownStoreKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(StoreKind::Null),
            "memory" => Ok(StoreKind::Memory),
            "file" => Ok(StoreKind::File),
            other => Err(UnknownStoreKind(other.to_owned())),
        }
    }
}

/// A [BlobStore] paired with a [Compressor], speaking [CacheEntry] values.
pub struct Cache {
    store: Box<dyn BlobStore>,
    compressor: Compressor,
}

impl Cache {
    pub fn new(store: Box<dyn BlobStore>, compressor: Compressor) -> Self {
        Self { store, compressor }
    }

    /// The compressor id that keys built for this cache must carry.
    pub fn compressor_id(&self) -> &'static str {
        self.compressor.id()
    }

    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StorageError> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(CacheEntry::from_bytes(&bytes, &self.compressor)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), StorageError> {
        let bytes = entry.to_bytes(&self.compressor)?;
        self.store.put(key, bytes).await
    }

    pub async fn purge(&self) -> Result<(), StorageError> {
        self.store.purge().await
    }
}
