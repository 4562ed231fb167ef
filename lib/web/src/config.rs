use sparql_proxy_store::Cache;
use std::path::PathBuf;
use std::time::Duration;

/// Holds the configuration for a sparql-proxy server.
pub struct ServerConfig {
    /// The socket address the server binds to.
    pub bind: String,
    /// Upstream SPARQL endpoint URL.
    pub backend: String,
    /// The cache serving repeated queries.
    pub cache: Cache,
    /// Jobs run against the backend in parallel.
    pub max_concurrency: usize,
    /// Admission cap for waiting jobs. `None` means unbounded.
    pub max_waiting: Option<usize>,
    /// Budget for one running job.
    pub job_timeout: Duration,
    /// How long terminal jobs stay visible to status polling.
    pub keep_old_jobs: Duration,
    /// Whether `SELECT` queries are split into `LIMIT`/`OFFSET` shards.
    pub enable_query_splitting: bool,
    /// `LIMIT` cap for one shard.
    pub max_chunk_limit: usize,
    /// Overall result cap when splitting.
    pub max_limit: usize,
    /// Basic-auth credentials for `/admin`.
    pub admin_user: String,
    pub admin_password: String,
    /// Whether `X-Forwarded-For` is honoured for the client IP.
    pub trust_proxy: bool,
    /// If set, one JSON line per request is appended here.
    pub query_log_path: Option<PathBuf>,
}
