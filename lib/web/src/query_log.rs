use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Appends one JSON line per proxied request to a configured file.
///
/// Logging is best-effort; failures are reported through tracing and never
/// reach the client.
pub(crate) struct QueryLogger {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryLogRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub query: String,
    pub cache_hit: bool,
    pub response: ResponseRecord,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseRecord {
    pub content_type: String,
    pub body: String,
}

impl QueryLogger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn append(&self, record: &QueryLogRecord) {
        let mut line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "query log record failed to serialize");
                return;
            }
        };
        line.push(b'\n');

        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(&line).await
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(error = %err, path = %self.path.display(), "query log write failed");
        }
    }
}
