use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "sparql-proxy")]
/// Caching, rate-limiting reverse proxy for a SPARQL endpoint
pub struct Args {
    /// TCP port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
    /// Upstream SPARQL endpoint URL
    #[arg(long, env = "SPARQL_BACKEND")]
    pub backend: Option<String>,
    /// Jobs run against the backend in parallel
    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = 1)]
    pub max_concurrency: usize,
    /// Admission cap for waiting jobs
    ///
    /// Unbounded when unset.
    #[arg(long, env = "MAX_WAITING")]
    pub max_waiting: Option<usize>,
    /// Basic-auth user for the admin page
    #[arg(long, env = "ADMIN_USER", default_value = "admin")]
    pub admin_user: String,
    /// Basic-auth password for the admin page
    #[arg(long, env = "ADMIN_PASSWORD", default_value = "password")]
    pub admin_password: String,
    /// Cache store backing repeated queries
    ///
    /// One of "null", "memory" or "file".
    #[arg(long, env = "CACHE_STORE", default_value = "null")]
    pub cache_store: String,
    /// Root directory of the file store
    #[arg(long, env = "CACHE_STORE_PATH", default_value = "/tmp/sparql-proxy/cache")]
    pub cache_store_path: PathBuf,
    /// Cache value codec
    ///
    /// One of "raw" or "deflate". Changing the codec re-namespaces the
    /// cache.
    #[arg(long, env = "COMPRESSOR", default_value = "raw")]
    pub compressor: String,
    /// Milliseconds before a running job times out
    #[arg(long, env = "JOB_TIMEOUT", default_value_t = 300_000)]
    pub job_timeout: u64,
    /// Milliseconds a finished job stays pollable under its token
    #[arg(long, env = "DURATION_TO_KEEP_OLD_JOBS", default_value_t = 300_000)]
    pub duration_to_keep_old_jobs: u64,
    /// Split SELECT queries into LIMIT/OFFSET shards
    #[arg(long, env = "ENABLE_QUERY_SPLITTING")]
    pub enable_query_splitting: bool,
    /// LIMIT cap for one shard
    #[arg(long, env = "MAX_CHUNK_LIMIT", default_value_t = 1000)]
    pub max_chunk_limit: usize,
    /// Overall result cap when splitting
    #[arg(long, env = "MAX_LIMIT", default_value_t = 10_000)]
    pub max_limit: usize,
    /// Honour X-Forwarded-For when recording client IPs
    #[arg(long, env = "TRUST_PROXY")]
    pub trust_proxy: bool,
    /// Append one JSON line per request to this file
    #[arg(long, env = "QUERY_LOG_PATH")]
    pub query_log_path: Option<PathBuf>,
}
