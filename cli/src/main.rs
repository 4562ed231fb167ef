use crate::cli::Args;
use anyhow::bail;
use clap::Parser;
use sparql_proxy_store::{
    BlobStore, Cache, Compressor, FileStore, MemoryStore, NullStore, StoreKind,
};
use sparql_proxy_web::ServerConfig;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let Some(backend) = args.backend.clone() else {
        bail!("SPARQL_BACKEND must be set")
    };

    let compressor: Compressor = args.compressor.parse()?;
    let kind: StoreKind = args.cache_store.parse()?;
    let store: Box<dyn BlobStore> = match kind {
        StoreKind::Null => Box::new(NullStore),
        StoreKind::Memory => Box::new(MemoryStore::new()),
        StoreKind::File => Box::new(FileStore::new(args.cache_store_path.clone())),
    };

    let config = ServerConfig {
        bind: format!("0.0.0.0:{}", args.port),
        backend,
        cache: Cache::new(store, compressor),
        max_concurrency: args.max_concurrency,
        max_waiting: args.max_waiting,
        job_timeout: Duration::from_millis(args.job_timeout),
        keep_old_jobs: Duration::from_millis(args.duration_to_keep_old_jobs),
        enable_query_splitting: args.enable_query_splitting,
        max_chunk_limit: args.max_chunk_limit,
        max_limit: args.max_limit,
        admin_user: args.admin_user,
        admin_password: args.admin_password,
        trust_proxy: args.trust_proxy,
        query_log_path: args.query_log_path,
    };
    sparql_proxy_web::serve(config).await
}
