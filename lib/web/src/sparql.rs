use crate::error::ProxyError;
use crate::query_log::{QueryLogRecord, ResponseRecord};
use crate::AppState;
use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sparql_proxy_query::{NormalizeError, NormalizedQuery, DEFAULT_ACCEPT};
use sparql_proxy_scheduler::{Job, JobOutcome, JobRequest};
use sparql_proxy_store::CacheEntry;
use std::net::SocketAddr;
use std::sync::Arc;

const SPARQL_QUERY_MEDIA_TYPE: &str = "application/sparql-query";
const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";
const MAX_QUERY_BODY_SIZE: usize = 1024 * 1024;

static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

#[derive(Debug, Default, Deserialize)]
struct SparqlParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// The query material extracted from a `/sparql` request, whichever of the
/// three protocol forms carried it.
pub(crate) struct SparqlRequest {
    pub query: String,
    pub token: Option<String>,
    pub accept: String,
    pub ip: Option<String>,
}

impl FromRequest<AppState> for SparqlRequest {
    type Rejection = ProxyError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let accept = req
            .headers()
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_ACCEPT)
            .to_owned();
        let ip = client_ip(
            req.headers(),
            req.extensions().get::<ConnectInfo<SocketAddr>>(),
            state.trust_proxy,
        );
        let params: SparqlParams = Query::try_from_uri(req.uri())
            .map_err(|e| ProxyError::BadRequest(e.to_string()))?
            .0;

        let method = req.method().clone();
        let (query, token) = if method == Method::GET {
            (params.query, params.token)
        } else if method == Method::POST {
            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            if content_type.starts_with(SPARQL_QUERY_MEDIA_TYPE) {
                let bytes = axum::body::to_bytes(req.into_body(), MAX_QUERY_BODY_SIZE)
                    .await
                    .map_err(|e| ProxyError::BadRequest(e.to_string()))?;
                let body = String::from_utf8(bytes.to_vec())
                    .map_err(|e| ProxyError::BadRequest(e.to_string()))?;
                (Some(body), params.token)
            } else if content_type.starts_with(FORM_MEDIA_TYPE) {
                let Form(form): Form<SparqlParams> = Form::from_request(req, &())
                    .await
                    .map_err(|e| ProxyError::BadRequest(e.to_string()))?;
                (form.query.or(params.query), form.token.or(params.token))
            } else {
                (None, params.token)
            }
        } else {
            return Err(ProxyError::MethodNotAllowed);
        };

        let query = query.filter(|q| !q.trim().is_empty());
        Ok(Self {
            query: query.ok_or(ProxyError::MissingQuery)?,
            token,
            accept,
            ip,
        })
    }
}

/// `ANY /sparql`: normalize, consult the cache, otherwise run the query
/// through the queue and answer with the job outcome.
pub(crate) async fn handle_sparql(
    State(state): State<AppState>,
    request: SparqlRequest,
) -> Result<Response, ProxyError> {
    let started_at = Utc::now();
    let normalized =
        NormalizedQuery::parse(&request.query, &request.accept).map_err(|e| match e {
            NormalizeError::Parse(message) => ProxyError::Parse(message),
            NormalizeError::OperationNotAllowed => ProxyError::QueryTypeNotAllowed,
        })?;
    let key = normalized.cache_key(state.cache.compressor_id());

    match state.cache.get(&key).await {
        Ok(Some(entry)) => {
            log_request(&state, &request, started_at, true, &entry);
            return Ok(proxy_response(entry, true));
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "cache lookup failed, treating as miss"),
    }

    let job = Job::new(
        JobRequest { query: normalized },
        request.token.clone(),
        request.ip.clone(),
    );
    let outcome = state
        .queue
        .enqueue(job)
        .await
        .map_err(|_| ProxyError::QueueFull)?;

    match outcome {
        JobOutcome::Success(entry) => {
            write_behind(&state, key, entry.clone());
            log_request(&state, &request, started_at, false, &entry);
            Ok(proxy_response(entry, false))
        }
        JobOutcome::Error { status, message } => Ok(backend_failure(status, message)),
        JobOutcome::Timeout => Err(ProxyError::Timeout),
        JobOutcome::Cancelled => Err(ProxyError::Cancelled),
    }
}

/// Preflight gets an explicit 200; CORS headers come from the layer.
pub(crate) async fn handle_options() -> StatusCode {
    StatusCode::OK
}

pub(crate) async fn handle_method_not_allowed() -> ProxyError {
    ProxyError::MethodNotAllowed
}

fn proxy_response(entry: CacheEntry, hit: bool) -> Response {
    let content_type = HeaderValue::from_str(&entry.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let cache_flag = HeaderValue::from_static(if hit { "hit" } else { "miss" });

    let mut response = Response::new(Body::from(entry.body));
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response.headers_mut().insert(X_CACHE.clone(), cache_flag);
    response
}

/// Upstream failures pass the status and body through; statuses the proxy
/// cannot represent collapse to 502, absent ones to 500.
fn backend_failure(status: Option<u16>, message: String) -> Response {
    let status = match status {
        Some(code) => StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
        None => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, message).into_response()
}

/// Cache writes happen after the response is on the wire and never fail it.
fn write_behind(state: &AppState, key: String, entry: CacheEntry) {
    let cache = Arc::clone(&state.cache);
    tokio::spawn(async move {
        if let Err(err) = cache.put(&key, &entry).await {
            tracing::warn!(error = %err, "cache write failed");
        }
    });
}

fn log_request(
    state: &AppState,
    request: &SparqlRequest,
    started_at: DateTime<Utc>,
    cache_hit: bool,
    entry: &CacheEntry,
) {
    let Some(logger) = &state.query_log else {
        return;
    };
    let finished_at = Utc::now();
    let record = QueryLogRecord {
        started_at,
        finished_at,
        elapsed_ms: (finished_at - started_at).num_milliseconds(),
        ip: request.ip.clone(),
        query: request.query.clone(),
        cache_hit,
        response: ResponseRecord {
            content_type: entry.content_type.clone(),
            body: String::from_utf8_lossy(&entry.body).into_owned(),
        },
    };
    let logger = Arc::clone(logger);
    tokio::spawn(async move { logger.append(&record).await });
}

fn client_ip(
    headers: &HeaderMap,
    connect: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy: bool,
) -> Option<String> {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_owned());
        }
    }
    connect.map(|ConnectInfo(addr)| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_header_needs_trust() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(
            client_ip(&headers, None, true).as_deref(),
            Some("203.0.113.9")
        );
        assert_eq!(client_ip(&headers, None, false), None);
    }

    #[test]
    fn backend_failure_maps_unrepresentable_statuses() {
        let response = backend_failure(Some(99), "weird".into());
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let response = backend_failure(None, "internal".into());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = backend_failure(Some(404), "missing".into());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
