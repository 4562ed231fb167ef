//! HTTP front-end for sparql-proxy.
//!
//! Wires the normalizer, cache, queue and executor into an axum
//! application: the proxied `/sparql` endpoint, job status polling, the
//! admin page and the live observer channel.

use axum::routing::get;
use axum::Router;
use sparql_proxy_execution::{QueryExecutor, SparqlBackend, SplitPolicy};
use sparql_proxy_scheduler::{Queue, QueueConfig};
use sparql_proxy_store::Cache;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod admin;
mod app;
mod config;
mod error;
mod jobs;
mod live;
mod query_log;
mod sparql;

pub use config::ServerConfig;
pub use error::ProxyError;

use crate::admin::AdminAccess;
use crate::query_log::QueryLogger;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub(crate) struct AppState {
    queue: Queue,
    cache: Arc<Cache>,
    admin: Arc<AdminAccess>,
    trust_proxy: bool,
    query_log: Option<Arc<QueryLogger>>,
}

/// Builds the axum application and its background tasks (queue workers and
/// the old-job sweeper). Must run inside a tokio runtime.
pub fn app(config: ServerConfig) -> Router {
    let backend = SparqlBackend::new(config.backend);
    let executor = Arc::new(QueryExecutor::new(
        backend,
        SplitPolicy {
            enabled: config.enable_query_splitting,
            max_chunk_limit: config.max_chunk_limit,
            max_limit: config.max_limit,
        },
    ));
    let queue = Queue::new(
        executor,
        QueueConfig {
            max_concurrency: config.max_concurrency,
            max_waiting: config.max_waiting,
            job_timeout: config.job_timeout,
        },
    );
    queue.spawn_sweeper(SWEEP_INTERVAL, config.keep_old_jobs);

    let state = AppState {
        queue,
        cache: Arc::new(config.cache),
        admin: Arc::new(AdminAccess::new(config.admin_user, config.admin_password)),
        trust_proxy: config.trust_proxy,
        query_log: config.query_log_path.map(|path| Arc::new(QueryLogger::new(path))),
    };

    Router::new()
        .route("/", get(app::handle_index))
        .route(
            "/sparql",
            get(sparql::handle_sparql)
                .post(sparql::handle_sparql)
                .options(sparql::handle_options)
                .fallback(sparql::handle_method_not_allowed),
        )
        .route("/jobs/{token}", get(jobs::handle_job_status))
        .route("/admin", get(admin::handle_admin))
        .route("/live", get(live::handle_live))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the listener and serves until the process is stopped.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from_str(&config.bind)?;
    let app = app(config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    Ok(axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?)
}
