//! Messages between the coordinator and worker threads.

use super::task::TaskId;
use crate::core::engine::FileReport;

/// Coordinator to worker
#[derive(Debug)]
pub enum WorkerCommand {
    /// Load the analysis engine
    Init,
    /// Analyze one file; the buffer moves with the message
    Analyze {
        task_id: TaskId,
        filename: String,
        bytes: Vec<u8>,
    },
}

/// Worker to coordinator
#[derive(Debug)]
pub enum WorkerReply {
    Ready,
    /// Engine load failed during `Init`
    InitFailed { error: String },
    Result { task_id: TaskId, report: FileReport },
    /// The task could not be run at all (e.g. the engine failed to load lazily)
    Error { task_id: TaskId, error: String },
    /// The worker thread is going away after a panic
    Crashed { reason: String },
}

/// A reply tagged with the worker that sent it.
///
/// `generation` changes every time a slot gets a new worker, so replies
/// from a terminated predecessor are recognisable and dropped.
#[derive(Debug)]
pub struct Envelope {
    pub slot: usize,
    pub generation: u64,
    pub reply: WorkerReply,
}
