use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio_util::sync::CancellationToken;

/// Media type of a raw SPARQL query in a POST body.
const SPARQL_QUERY: &str = "application/sparql-query";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Http(String),
    /// The backend answered with a non-success status. The body is kept so
    /// the proxy can pass it through to the client.
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },
    #[error("backend returned malformed results: {0}")]
    MalformedResults(String),
    #[error("query was cancelled")]
    Cancelled,
}

/// A successful upstream response.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// HTTP client for one upstream SPARQL endpoint.
///
/// Requests carry no client-side timeout; the job timeout governs and
/// cancellation aborts the in-flight call.
#[derive(Debug, Clone)]
pub struct SparqlBackend {
    endpoint: String,
    http: reqwest::Client,
}

impl SparqlBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POSTs `query` and returns the upstream response. The future races
    /// `cancel`; dropping the request mid-flight closes the connection.
    pub async fn execute(
        &self,
        query: &str,
        accept: &str,
        cancel: &CancellationToken,
    ) -> Result<BackendResponse, BackendError> {
        let request = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, SPARQL_QUERY)
            .header(ACCEPT, accept)
            .body(query.to_owned())
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(BackendError::Cancelled),
            response = request => response.map_err(|e| BackendError::Http(e.to_string()))?,
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_owned();

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(BackendError::Cancelled),
            body = response.bytes() => body.map_err(|e| BackendError::Http(e.to_string()))?,
        };

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(BackendResponse {
            content_type,
            body: body.to_vec(),
        })
    }
}
