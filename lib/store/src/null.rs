use crate::error::StorageError;
use crate::BlobStore;
use async_trait::async_trait;

/// A store that remembers nothing. Every lookup is a miss.
#[derive(Debug, Default)]
pub struct NullStore;

#[async_trait]
impl BlobStore for NullStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _bytes: Vec<u8>) -> Result<(), StorageError> {
        Ok(())
    }

    async fn purge(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_misses() {
        let store = NullStore;
        store.put("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
