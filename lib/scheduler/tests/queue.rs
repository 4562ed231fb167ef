#![cfg(test)]

use async_trait::async_trait;
use chrono::Utc;
use sparql_proxy_query::{NormalizedQuery, DEFAULT_ACCEPT};
use sparql_proxy_scheduler::{
    Job, JobError, JobOutcome, JobRequest, JobRunner, JobState, Queue, QueueConfig,
};
use sparql_proxy_store::CacheEntry;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Runner that records start order and holds every job until the test
/// releases a permit.
struct GatedRunner {
    started: Mutex<Vec<String>>,
    gate: Semaphore,
}

impl GatedRunner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            started: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
        })
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRunner for GatedRunner {
    async fn run(
        &self,
        request: &JobRequest,
        cancel: &CancellationToken,
    ) -> Result<CacheEntry, JobError> {
        self.started
            .lock()
            .unwrap()
            .push(request.query.canonical().to_owned());
        tokio::select! {
            _ = cancel.cancelled() => Err(JobError::Cancelled),
            permit = self.gate.acquire() => {
                permit.unwrap().forget();
                Ok(CacheEntry::new("text/plain", request.query.canonical().as_bytes().to_vec()))
            }
        }
    }
}

fn job(text: &str, token: Option<&str>) -> Job {
    Job::new(
        JobRequest {
            query: NormalizedQuery::parse(text, DEFAULT_ACCEPT).unwrap(),
        },
        token.map(str::to_owned),
        None,
    )
}

async fn settle() {
    // Let spawned queue tasks reach their next await point.
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn jobs_start_in_admission_order() {
    let runner = GatedRunner::new();
    let queue = Queue::new(runner.clone(), QueueConfig::default());

    let queries = [
        "SELECT ?a WHERE { ?a ?p ?o }",
        "SELECT ?b WHERE { ?b ?p ?o }",
        "SELECT ?c WHERE { ?c ?p ?o }",
    ];
    let expected: Vec<String> = queries
        .iter()
        .map(|q| {
            NormalizedQuery::parse(q, DEFAULT_ACCEPT)
                .unwrap()
                .canonical()
                .to_owned()
        })
        .collect();

    runner.gate.add_permits(3);
    let (a, b, c) = tokio::join!(
        queue.enqueue(job(queries[0], None)),
        queue.enqueue(job(queries[1], None)),
        queue.enqueue(job(queries[2], None)),
    );
    for outcome in [a.unwrap(), b.unwrap(), c.unwrap()] {
        assert!(matches!(outcome, JobOutcome::Success(_)));
    }
    assert_eq!(runner.started(), expected);
}

#[tokio::test]
async fn waiting_capacity_is_enforced() {
    let runner = GatedRunner::new();
    let queue = Queue::new(
        runner.clone(),
        QueueConfig {
            max_concurrency: 1,
            max_waiting: Some(1),
            ..QueueConfig::default()
        },
    );

    let first = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.enqueue(job("SELECT ?a WHERE { ?a ?p ?o }", None)).await })
    };
    settle().await;
    let second = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.enqueue(job("SELECT ?b WHERE { ?b ?p ?o }", None)).await })
    };
    settle().await;

    let snapshot = queue.snapshot();
    assert_eq!(snapshot.running.len(), 1);
    assert_eq!(snapshot.waiting.len(), 1);

    // Third submission bounces without waiting.
    let refused = queue.enqueue(job("SELECT ?c WHERE { ?c ?p ?o }", None)).await;
    assert!(refused.is_err());
    assert_eq!(refused.unwrap_err().to_string(), "queue is full");

    runner.gate.add_permits(2);
    assert!(matches!(
        first.await.unwrap().unwrap(),
        JobOutcome::Success(_)
    ));
    assert!(matches!(
        second.await.unwrap().unwrap(),
        JobOutcome::Success(_)
    ));
    assert!(queue.snapshot().running.is_empty());
}

#[tokio::test]
async fn cancelling_a_waiting_job_releases_the_waiter() {
    let runner = GatedRunner::new();
    let queue = Queue::new(
        runner.clone(),
        QueueConfig {
            max_concurrency: 1,
            ..QueueConfig::default()
        },
    );

    let blocker = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.enqueue(job("SELECT ?a WHERE { ?a ?p ?o }", None)).await })
    };
    settle().await;

    let waiting = job("SELECT ?b WHERE { ?b ?p ?o }", Some("tok"));
    let waiting_id = waiting.id().to_owned();
    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.enqueue(waiting).await })
    };
    settle().await;

    assert!(queue.cancel(&waiting_id));
    let outcome = waiter.await.unwrap().unwrap();
    assert!(matches!(outcome, JobOutcome::Cancelled));

    let summary = queue.job_status("tok").unwrap();
    assert_eq!(summary.state, JobState::Cancelled);
    assert!(summary.done_at.is_some());

    // The runner never saw the cancelled job.
    assert_eq!(runner.started().len(), 1);

    // Cancelling a terminal job reports no transition.
    assert!(!queue.cancel(&waiting_id));

    runner.gate.add_permits(1);
    blocker.await.unwrap().unwrap();
}

#[tokio::test]
async fn cancelling_a_running_job_aborts_it() {
    let runner = GatedRunner::new();
    let queue = Queue::new(runner.clone(), QueueConfig::default());

    let running = job("SELECT ?a WHERE { ?a ?p ?o }", Some("tok"));
    let running_id = running.id().to_owned();
    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.enqueue(running).await })
    };
    settle().await;
    assert_eq!(queue.snapshot().running.len(), 1);

    assert!(queue.cancel(&running_id));
    let outcome = waiter.await.unwrap().unwrap();
    assert!(matches!(outcome, JobOutcome::Cancelled));
    assert_eq!(queue.job_status("tok").unwrap().state, JobState::Cancelled);
}

#[tokio::test]
async fn running_jobs_time_out() {
    let runner = GatedRunner::new();
    let queue = Queue::new(
        runner.clone(),
        QueueConfig {
            job_timeout: Duration::from_millis(50),
            ..QueueConfig::default()
        },
    );

    let outcome = queue
        .enqueue(job("SELECT ?a WHERE { ?a ?p ?o }", Some("tok")))
        .await
        .unwrap();
    assert!(matches!(outcome, JobOutcome::Timeout));

    let summary = queue.job_status("tok").unwrap();
    assert_eq!(summary.state, JobState::Error);
    assert!(summary.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn sweeper_threshold_drops_old_terminal_jobs() {
    let runner = GatedRunner::new();
    let queue = Queue::new(runner.clone(), QueueConfig::default());

    runner.gate.add_permits(1);
    queue
        .enqueue(job("SELECT ?a WHERE { ?a ?p ?o }", Some("tok")))
        .await
        .unwrap();
    assert!(queue.job_status("tok").is_some());

    // A threshold in the future ages every terminal job out.
    queue.sweep_old_items(Utc::now() + chrono::Duration::minutes(1));
    assert!(queue.job_status("tok").is_none());
    assert!(queue.snapshot().recent.is_empty());
}

#[tokio::test]
async fn snapshots_are_broadcast_in_transition_order() {
    let runner = GatedRunner::new();
    let queue = Queue::new(runner.clone(), QueueConfig::default());
    let mut events = queue.subscribe();

    runner.gate.add_permits(1);
    queue
        .enqueue(job("SELECT ?a WHERE { ?a ?p ?o }", Some("tok")))
        .await
        .unwrap();

    let mut states = Vec::new();
    while let Ok(snapshot) = events.try_recv() {
        if let Some(summary) = snapshot
            .waiting
            .iter()
            .chain(snapshot.running.iter())
            .chain(snapshot.recent.iter())
            .next()
        {
            states.push(summary.state);
        }
    }
    assert_eq!(states.first(), Some(&JobState::Waiting));
    assert_eq!(states.last(), Some(&JobState::Success));

    // Snapshots serialize for the live channel.
    let json = serde_json::to_string(&queue.snapshot()).unwrap();
    assert!(json.contains("\"recent\""));
}

#[tokio::test]
async fn most_recent_job_wins_a_shared_token() {
    let runner = GatedRunner::new();
    let queue = Queue::new(runner.clone(), QueueConfig::default());

    runner.gate.add_permits(2);
    queue
        .enqueue(job("SELECT ?a WHERE { ?a ?p ?o }", Some("tok")))
        .await
        .unwrap();
    queue
        .enqueue(job("SELECT ?b WHERE { ?b ?p ?o }", Some("tok")))
        .await
        .unwrap();

    let summary = queue.job_status("tok").unwrap();
    assert!(summary.query.contains("?b"));
}
