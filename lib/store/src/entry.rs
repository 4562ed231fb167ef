use crate::compressor::Compressor;
use crate::error::StorageError;
use serde::{Deserialize, Serialize};

/// A cached upstream response: the content type negotiated with the backend
/// and the raw body bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl CacheEntry {
    pub fn new(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// Serializes the entry and runs it through `compressor`. Stores only
    /// ever see the resulting opaque bytes.
    pub fn to_bytes(&self, compressor: &Compressor) -> Result<Vec<u8>, StorageError> {
        let raw = bincode::serialize(self).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        compressor.encode(&raw)
    }

    /// Inverts [to_bytes](CacheEntry::to_bytes).
    pub fn from_bytes(bytes: &[u8], compressor: &Compressor) -> Result<Self, StorageError> {
        let raw = compressor.decode(bytes)?;
        bincode::deserialize(&raw).map_err(|e| StorageError::Corrupt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_every_compressor() {
        let entry = CacheEntry::new(
            "application/sparql-results+json",
            br#"{"head":{"vars":["s"]},"results":{"bindings":[]}}"#.to_vec(),
        );
        for compressor in [Compressor::Raw, Compressor::Deflate] {
            let bytes = entry.to_bytes(&compressor).unwrap();
            let decoded = CacheEntry::from_bytes(&bytes, &compressor).unwrap();
            assert_eq!(decoded, entry);
        }
    }

    #[test]
    fn rejects_truncated_bytes() {
        assert!(CacheEntry::from_bytes(b"", &Compressor::Raw).is_err());
    }
}
