use crate::job::{Job, JobOutcome, JobRunner, JobState, JobSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

/// Capacity and timing limits for a [Queue].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Jobs run in parallel. Clamped to at least 1.
    pub max_concurrency: usize,
    /// Admission cap for waiting jobs. `None` means unbounded.
    pub max_waiting: Option<usize>,
    /// Budget for one running job, measured from its start.
    pub job_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            max_waiting: None,
            job_timeout: Duration::from_secs(300),
        }
    }
}

/// Enqueue was refused because the waiting list is at capacity.
#[derive(Debug, thiserror::Error)]
#[error("queue is full")]
pub struct QueueFull;

/// Value snapshot of the queue, broadcast to observers on every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub waiting: Vec<JobSummary>,
    pub running: Vec<JobSummary>,
    pub recent: Vec<JobSummary>,
}

#[derive(Default)]
struct QueueInner {
    waiting: VecDeque<Arc<Job>>,
    running: Vec<Arc<Job>>,
    recent: Vec<Arc<Job>>,
    admitted: u64,
}

struct Shared {
    runner: Arc<dyn JobRunner>,
    config: QueueConfig,
    inner: Mutex<QueueInner>,
    events: broadcast::Sender<QueueSnapshot>,
}

/// Bounded FIFO of jobs. Cloning yields another handle to the same queue.
///
/// All mutation happens under one mutex that is never held across an await
/// point; runner futures execute on spawned tasks.
#[derive(Clone)]
pub struct Queue {
    shared: Arc<Shared>,
}

impl Queue {
    pub fn new(runner: Arc<dyn JobRunner>, mut config: QueueConfig) -> Self {
        config.max_concurrency = config.max_concurrency.max(1);
        let (events, _) = broadcast::channel(256);
        Self {
            shared: Arc::new(Shared {
                runner,
                config,
                inner: Mutex::new(QueueInner::default()),
                events,
            }),
        }
    }

    /// Subscribes to state snapshots. Snapshots for one job arrive in
    /// transition order; slow receivers may observe gaps, never reordering.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueSnapshot> {
        self.shared.events.subscribe()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let inner = self.shared.inner.lock().unwrap();
        QueueSnapshot {
            waiting: inner.waiting.iter().map(|j| j.summary()).collect(),
            running: inner.running.iter().map(|j| j.summary()).collect(),
            recent: inner.recent.iter().map(|j| j.summary()).collect(),
        }
    }

    /// Admits `job` and waits for its terminal outcome.
    ///
    /// Fails immediately with [QueueFull] when the waiting list is at
    /// capacity; admitted jobs start in FIFO order as slots free up.
    pub async fn enqueue(&self, job: Job) -> Result<JobOutcome, QueueFull> {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if let Some(max) = self.shared.config.max_waiting {
                if inner.waiting.len() >= max {
                    return Err(QueueFull);
                }
            }
            job.meta.lock().unwrap().seq = inner.admitted;
            inner.admitted += 1;
            *job.reply.lock().unwrap() = Some(tx);
            inner.waiting.push_back(Arc::new(job));
        }
        self.publish();
        self.dispatch();

        // The sender lives in the job until a terminal transition takes it,
        // so the channel only closes if the queue itself is torn down.
        Ok(rx.await.unwrap_or(JobOutcome::Cancelled))
    }

    /// Cancels a waiting or running job. Returns whether a live job was hit.
    pub fn cancel(&self, id: &str) -> bool {
        let waiting_job = {
            let mut inner = self.shared.inner.lock().unwrap();
            if let Some(pos) = inner.waiting.iter().position(|j| j.id() == id) {
                inner.waiting.remove(pos)
            } else if let Some(job) = inner.running.iter().find(|j| j.id() == id) {
                // The running task observes the token and completes the job.
                job.cancel_token().cancel();
                return true;
            } else {
                return false;
            }
        };
        if let Some(job) = waiting_job {
            tracing::debug!(id = %job.id(), "cancelled waiting job");
            self.complete(&job, JobOutcome::Cancelled);
        }
        true
    }

    /// Most recently admitted job carrying `token`, across all lists.
    pub fn job_status(&self, token: &str) -> Option<JobSummary> {
        let inner = self.shared.inner.lock().unwrap();
        inner
            .waiting
            .iter()
            .chain(inner.running.iter())
            .chain(inner.recent.iter())
            .filter(|j| j.token() == Some(token))
            .max_by_key(|j| j.seq())
            .map(|j| j.summary())
    }

    /// Drops terminal jobs finished before `threshold` from the recent list.
    pub fn sweep_old_items(&self, threshold: DateTime<Utc>) {
        let swept = {
            let mut inner = self.shared.inner.lock().unwrap();
            let before = inner.recent.len();
            inner.recent.retain(|j| {
                let meta = j.meta.lock().unwrap();
                meta.done_at.map_or(true, |done| done >= threshold)
            });
            before != inner.recent.len()
        };
        if swept {
            self.publish();
        }
    }

    /// Periodically sweeps terminal jobs older than `keep`.
    pub fn spawn_sweeper(&self, every: Duration, keep: Duration) -> JoinHandle<()> {
        let queue = self.clone();
        let keep = chrono::Duration::from_std(keep).unwrap_or(chrono::Duration::MAX);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let threshold = Utc::now()
                    .checked_sub_signed(keep)
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                queue.sweep_old_items(threshold);
            }
        })
    }

    fn publish(&self) {
        let _ = self.shared.events.send(self.snapshot());
    }

    fn dispatch(&self) {
        let mut started = false;
        {
            let mut inner = self.shared.inner.lock().unwrap();
            while inner.running.len() < self.shared.config.max_concurrency {
                let Some(job) = inner.waiting.pop_front() else {
                    break;
                };
                {
                    let mut meta = job.meta.lock().unwrap();
                    meta.state = JobState::Running;
                    meta.started_at = Some(Utc::now());
                }
                inner.running.push(Arc::clone(&job));
                let queue = self.clone();
                tokio::spawn(async move { queue.run_job(job).await });
                started = true;
            }
        }
        if started {
            self.publish();
        }
    }

    async fn run_job(self, job: Arc<Job>) {
        let cancel = job.cancel_token().clone();
        let timeout = self.shared.config.job_timeout;
        let outcome = tokio::select! {
            _ = cancel.cancelled() => JobOutcome::Cancelled,
            result = tokio::time::timeout(timeout, self.shared.runner.run(job.request(), &cancel)) => {
                match result {
                    Err(_) => {
                        // Abort any in-flight backend call before reporting.
                        cancel.cancel();
                        JobOutcome::Timeout
                    }
                    Ok(Ok(entry)) => JobOutcome::Success(entry),
                    Ok(Err(err)) => err.into_outcome(),
                }
            }
        };
        self.complete(&job, outcome);
        self.dispatch();
    }

    fn complete(&self, job: &Arc<Job>, outcome: JobOutcome) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            inner.running.retain(|j| j.id() != job.id());
            {
                let mut meta = job.meta.lock().unwrap();
                meta.done_at = Some(Utc::now());
                match &outcome {
                    JobOutcome::Success(_) => meta.state = JobState::Success,
                    JobOutcome::Error { message, .. } => {
                        meta.state = JobState::Error;
                        meta.error = Some(message.clone());
                    }
                    JobOutcome::Timeout => {
                        meta.state = JobState::Error;
                        meta.error = Some("job timed out".to_owned());
                    }
                    JobOutcome::Cancelled => meta.state = JobState::Cancelled,
                }
            }
            inner.recent.push(Arc::clone(job));
        }
        if let Some(tx) = job.reply.lock().unwrap().take() {
            let _ = tx.send(outcome);
        }
        self.publish();
    }
}
