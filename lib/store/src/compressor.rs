use crate::error::StorageError;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::str::FromStr;

/// A byte-level value transform applied to cache entries before they reach a
/// store.
///
/// The [id](Compressor::id) is part of every cache key, so switching codecs
/// re-namespaces the cache and stale entries written by a previous codec are
/// never decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    /// Stores values unchanged.
    Raw,
    /// DEFLATE via [flate2].
    Deflate,
}

impl Compressor {
    /// Short identifier used as the cache key suffix.
    pub fn id(&self) -> &'static str {
        match self {
            Compressor::Raw => "raw",
            Compressor::Deflate => "deflate",
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>, StorageError> {
        match self {
            Compressor::Raw => Ok(bytes.to_vec()),
            Compressor::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(bytes)?;
                Ok(encoder.finish()?)
            }
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, StorageError> {
        match self {
            Compressor::Raw => Ok(bytes.to_vec()),
            Compressor::Deflate => {
                let mut out = Vec::new();
                DeflateDecoder::new(bytes).read_to_end(&mut out)?;
                Ok(out)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown compressor '{0}', expected 'raw' or 'deflate'")]
pub struct UnknownCompressor(String);

impl FromStr for Compressor {
    type Err = UnknownCompressor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Compressor::Raw),
            "deflate" => Ok(Compressor::Deflate),
            other => Err(UnknownCompressor(other.to_owned())),
        }
    }
}
