//! The job queue for sparql-proxy.
//!
//! Every cache miss becomes a [Job] admitted to the [Queue], which runs up
//! to a configured number of jobs in parallel, keeps the rest in FIFO
//! order, and broadcasts a state snapshot to observers on every transition.

mod job;
mod queue;

pub use job::{
    Job, JobError, JobOutcome, JobRequest, JobRunner, JobState, JobSummary,
};
pub use queue::{Queue, QueueConfig, QueueFull, QueueSnapshot};
