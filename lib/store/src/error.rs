use std::io;

/// An error raised from a cache store or the value codec.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}
