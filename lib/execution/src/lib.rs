//! Query execution for sparql-proxy.
//!
//! The [SparqlBackend] talks to the upstream endpoint; the [QueryExecutor]
//! decides between forwarding a query verbatim and splitting a `SELECT`
//! into bounded `LIMIT`/`OFFSET` shards whose results are merged into one
//! result set.

mod chunk;
mod client;
mod results;

pub use chunk::{QueryExecutor, SplitPolicy};
pub use client::{BackendError, BackendResponse, SparqlBackend};
pub use results::{SolutionBindings, SolutionHead, SolutionPage, SPARQL_RESULTS_JSON};
