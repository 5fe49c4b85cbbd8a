//! Event type definitions for progress reporting.

use crate::core::engine::FileReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All events emitted by the ingestion core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Per-batch ingestion events
    Batch(BatchEvent),
    /// Worker pool lifecycle events
    Pool(PoolEvent),
    /// Batched result updates for the display
    Results(ResultsEvent),
}

/// Events during the processing of one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
    /// Processing has started
    Started { batch_id: Uuid, total: usize },
    /// A file finished, was skipped as a duplicate, or could not be read
    Progress(BatchProgress),
    /// A file had the same content as one seen earlier in the session
    Duplicate { filename: String, fingerprint: String },
    /// Every file of the batch is accounted for
    Completed { summary: BatchSummary },
}

/// Progress information for a batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Files accounted for so far
    pub completed: usize,
    /// Files in the batch
    pub total: usize,
    /// `completed / total`, exactly 1.0 once the batch is done
    pub fraction: f64,
}

impl BatchProgress {
    pub fn new(completed: usize, total: usize) -> Self {
        let fraction = if total == 0 {
            1.0
        } else {
            completed as f64 / total as f64
        };
        Self {
            completed,
            total,
            fraction,
        }
    }

    /// The terminal progress value
    pub fn finished(total: usize) -> Self {
        Self {
            completed: total,
            total,
            fraction: 1.0,
        }
    }
}

/// Summary of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    /// Files in the batch
    pub total: usize,
    /// Files submitted for analysis
    pub analyzed: usize,
    /// Files skipped because their content was already seen
    pub duplicates: usize,
    /// Files whose bytes could not be read
    pub unreadable: usize,
    pub passed: usize,
    pub failed: usize,
    /// Everything else: shortcuts, parse failures and worker errors
    pub special: usize,
    pub duration_ms: u64,
    pub finished_at: DateTime<Utc>,
}

/// Worker pool lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PoolEvent {
    /// Every worker loaded its engine
    Ready { workers: usize },
    /// A worker died while running a task
    WorkerCrashed { slot: usize, task_id: Option<u64> },
    /// A replacement worker loaded its engine and is accepting work
    WorkerReplaced { slot: usize },
    /// A replacement worker could not be started; the slot stays out of service
    ReplacementFailed { slot: usize, reason: String },
    /// The pool was torn down
    Destroyed { failed_tasks: usize },
}

/// Result updates for the display layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResultsEvent {
    /// One batched update: rows appended to the displayed list
    Flushed { rows: Vec<FileReport> },
}
