use crate::slice;
use md5::{Digest, Md5};
use spargebra::{Query, Update};

/// Media type assumed when a request does not negotiate one.
pub const DEFAULT_ACCEPT: &str = "application/sparql-results+json";

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The text is not a well-formed SPARQL query. Carries the parser
    /// message for the client.
    #[error("query parse failed: {0}")]
    Parse(String),
    /// The text is a well-formed SPARQL *update*; the proxy only forwards
    /// read operations.
    #[error("query type not allowed")]
    OperationNotAllowed,
}

/// A query accepted by the proxy, in canonical form.
///
/// The canonical text is the re-serialized algebra. The parser resolves the
/// `PREFIX`/`BASE` prologue and the serializer emits absolute IRIs, so
/// queries that differ only in whitespace, comments or prefix naming
/// canonicalize identically.
#[derive(Debug, Clone)]
pub struct NormalizedQuery {
    query: Query,
    canonical: String,
    accept: String,
    fingerprint: String,
}

impl NormalizedQuery {
    pub fn parse(text: &str, accept: &str) -> Result<Self, NormalizeError> {
        let query = match Query::parse(text, None) {
            Ok(query) => query,
            Err(e) => {
                return Err(if Update::parse(text, None).is_ok() {
                    NormalizeError::OperationNotAllowed
                } else {
                    NormalizeError::Parse(e.to_string())
                });
            }
        };
        let canonical = query.to_string();
        let fingerprint = fingerprint(&canonical, accept);
        Ok(Self {
            query,
            canonical,
            accept: accept.to_owned(),
            fingerprint,
        })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn accept(&self) -> &str {
        &self.accept
    }

    /// Hex digest over the canonical text and the accept type. The accept
    /// type participates so a JSON result is never served to an XML client.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The store key: fingerprint plus the codec namespace.
    pub fn cache_key(&self, compressor_id: &str) -> String {
        format!("{}.{compressor_id}", self.fingerprint)
    }

    pub fn is_select(&self) -> bool {
        matches!(self.query, Query::Select { .. })
    }

    /// The user-written `OFFSET`/`LIMIT` window of a `SELECT`.
    pub fn select_slice(&self) -> Option<(usize, Option<usize>)> {
        slice::select_slice(&self.query)
    }
}

fn fingerprint(canonical: &str, accept: &str) -> String {
    hex::encode(
        Md5::new()
            .chain_update(canonical)
            .chain_update([0u8])
            .chain_update(accept)
            .finalize(),
    )
}
