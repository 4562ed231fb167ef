use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sparql_proxy_query::NormalizedQuery;
use sparql_proxy_store::CacheEntry;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one query attempt.
///
/// States advance monotonically `waiting → running → terminal`; the queue
/// is the only mutator, so no retrograde transition can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Waiting,
    Running,
    Success,
    Error,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Error | JobState::Cancelled)
    }
}

/// Terminal result of a job, delivered to the waiting requester.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success(CacheEntry),
    /// The backend or the runner failed. `status` is the upstream HTTP
    /// status when one exists; absent means an internal failure (500).
    Error {
        status: Option<u16>,
        message: String,
    },
    Timeout,
    Cancelled,
}

/// Failure modes a [JobRunner] can surface.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error("backend returned status {status}")]
    Backend { status: u16, body: String },
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("{0}")]
    Internal(String),
    #[error("job was cancelled")]
    Cancelled,
}

impl JobError {
    pub(crate) fn into_outcome(self) -> JobOutcome {
        match self {
            JobError::Backend { status, body } => JobOutcome::Error {
                status: Some(status),
                message: body,
            },
            JobError::Unreachable(message) => JobOutcome::Error {
                status: Some(502),
                message,
            },
            JobError::Internal(message) => JobOutcome::Error {
                status: None,
                message,
            },
            JobError::Cancelled => JobOutcome::Cancelled,
        }
    }
}

/// What a runner needs to execute one admitted query.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub query: NormalizedQuery,
}

/// Executes admitted jobs. The queue calls `run` exactly once per job and
/// cancels the token to abort in-flight work.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(
        &self,
        request: &JobRequest,
        cancel: &CancellationToken,
    ) -> Result<CacheEntry, JobError>;
}

#[derive(Debug)]
pub(crate) struct JobMeta {
    pub state: JobState,
    pub seq: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub done_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// One query attempt: identity, request, lifecycle metadata and the reply
/// channel back to the HTTP waiter.
#[derive(Debug)]
pub struct Job {
    id: String,
    token: Option<String>,
    request: JobRequest,
    ip: Option<String>,
    created_at: DateTime<Utc>,
    cancel: CancellationToken,
    pub(crate) meta: Mutex<JobMeta>,
    pub(crate) reply: Mutex<Option<oneshot::Sender<JobOutcome>>>,
}

impl Job {
    pub fn new(request: JobRequest, token: Option<String>, ip: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            token,
            request,
            ip,
            created_at: Utc::now(),
            cancel: CancellationToken::new(),
            meta: Mutex::new(JobMeta {
                state: JobState::Waiting,
                seq: 0,
                started_at: None,
                done_at: None,
                error: None,
            }),
            reply: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn request(&self) -> &JobRequest {
        &self.request
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn state(&self) -> JobState {
        self.meta.lock().unwrap().state
    }

    pub(crate) fn seq(&self) -> u64 {
        self.meta.lock().unwrap().seq
    }

    pub fn summary(&self) -> JobSummary {
        let meta = self.meta.lock().unwrap();
        JobSummary {
            id: self.id.clone(),
            token: self.token.clone(),
            state: meta.state,
            query: self.request.query.canonical().to_owned(),
            ip: self.ip.clone(),
            created_at: self.created_at,
            started_at: meta.started_at,
            done_at: meta.done_at,
            error: meta.error.clone(),
        }
    }
}

/// Observer view of a job. Never carries result bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub state: JobState,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
