use crate::client::{BackendError, SparqlBackend};
use crate::results::{SolutionPage, SPARQL_RESULTS_JSON};
use async_trait::async_trait;
use sparql_proxy_query::{with_slice, NormalizedQuery};
use sparql_proxy_scheduler::{JobError, JobRequest, JobRunner};
use sparql_proxy_store::CacheEntry;
use tokio_util::sync::CancellationToken;

/// Limits governing query splitting.
#[derive(Debug, Clone)]
pub struct SplitPolicy {
    pub enabled: bool,
    /// `LIMIT` cap for one shard.
    pub max_chunk_limit: usize,
    /// Overall result cap when splitting.
    pub max_limit: usize,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_chunk_limit: 1000,
            max_limit: 10_000,
        }
    }
}

/// Runs admitted jobs against the backend.
///
/// `SELECT` queries are split into sequential `LIMIT`/`OFFSET` shards when
/// splitting is enabled; everything else is forwarded verbatim with the
/// client's accept type.
pub struct QueryExecutor {
    backend: SparqlBackend,
    split: SplitPolicy,
}

impl QueryExecutor {
    pub fn new(backend: SparqlBackend, split: SplitPolicy) -> Self {
        Self { backend, split }
    }

    async fn forward(
        &self,
        query: &NormalizedQuery,
        cancel: &CancellationToken,
    ) -> Result<CacheEntry, BackendError> {
        let response = self
            .backend
            .execute(query.canonical(), query.accept(), cancel)
            .await?;
        Ok(CacheEntry::new(response.content_type, response.body))
    }

    /// Issues shards `OFFSET o LIMIT min(chunk, remaining)` strictly in
    /// offset order, stopping early once the backend runs dry, and merges
    /// them into a single result set under the first shard's head.
    async fn run_split(
        &self,
        query: &NormalizedQuery,
        cancel: &CancellationToken,
    ) -> Result<CacheEntry, BackendError> {
        let (user_offset, user_limit) = query.select_slice().unwrap_or((0, None));
        let effective = user_limit.map_or(self.split.max_limit, |l| l.min(self.split.max_limit));
        // A zero chunk size would never make progress.
        let chunk = self.split.max_chunk_limit.min(effective).max(1);

        let mut merged: Option<SolutionPage> = None;
        let mut collected = 0;
        let mut offset = user_offset;
        while collected < effective {
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            let want = chunk.min(effective - collected);
            let shard = with_slice(query.query(), offset, want).to_string();
            tracing::debug!(offset, limit = want, "issuing shard");

            let response = self
                .backend
                .execute(&shard, SPARQL_RESULTS_JSON, cancel)
                .await?;
            let page: SolutionPage = serde_json::from_slice(&response.body)
                .map_err(|e| BackendError::MalformedResults(e.to_string()))?;

            let got = page.results.bindings.len();
            collected += got;
            match merged.as_mut() {
                None => merged = Some(page),
                Some(m) => m.results.bindings.extend(page.results.bindings),
            }
            if got < want {
                break;
            }
            offset += want;
        }

        let page = merged.unwrap_or_default();
        let body = serde_json::to_vec(&page)
            .map_err(|e| BackendError::MalformedResults(e.to_string()))?;
        Ok(CacheEntry::new(SPARQL_RESULTS_JSON, body))
    }
}

#[async_trait]
impl JobRunner for QueryExecutor {
    async fn run(
        &self,
        request: &JobRequest,
        cancel: &CancellationToken,
    ) -> Result<CacheEntry, JobError> {
        let query = &request.query;
        let result = if self.split.enabled && query.is_select() {
            self.run_split(query, cancel).await
        } else {
            self.forward(query, cancel).await
        };
        result.map_err(|e| match e {
            BackendError::Status { status, body } => JobError::Backend { status, body },
            BackendError::Http(message) => JobError::Unreachable(message),
            BackendError::MalformedResults(message) => JobError::Internal(message),
            BackendError::Cancelled => JobError::Cancelled,
        })
    }
}
