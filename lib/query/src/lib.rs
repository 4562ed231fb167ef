//! SPARQL normalization for sparql-proxy.
//!
//! Incoming query text is parsed with [spargebra], gated to read-only
//! operations, re-serialized into a canonical form and fingerprinted. Two
//! requests that differ only lexically share a canonical form, and with it
//! a cache entry.

mod normalize;
mod slice;

pub use normalize::{NormalizeError, NormalizedQuery, DEFAULT_ACCEPT};
pub use slice::{select_slice, with_slice};
