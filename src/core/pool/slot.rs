//! Per-worker slot state.

use super::task::{ResultCallback, TaskId};
use super::worker::WorkerHandle;
use std::fmt;

/// Lifecycle of one slot.
///
/// `Starting -> Idle <-> Busy`; on a crash `Busy -> Replacing -> Idle`.
/// The completion callback of the running task lives inside `Busy`, so
/// leaving that state is the only way to get hold of it.
pub enum SlotState {
    /// Initial worker is loading its engine
    Starting,
    Idle,
    Busy {
        task_id: TaskId,
        on_result: ResultCallback,
    },
    /// A replacement worker is loading, or failed to and never will
    Replacing,
}

impl SlotState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SlotState::Idle)
    }
}

impl fmt::Debug for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Starting => f.write_str("Starting"),
            SlotState::Idle => f.write_str("Idle"),
            SlotState::Busy { task_id, .. } => write!(f, "Busy({})", task_id),
            SlotState::Replacing => f.write_str("Replacing"),
        }
    }
}

/// One position in the pool
pub struct WorkerSlot {
    /// Bumped every time the slot gets a new worker
    pub generation: u64,
    pub state: SlotState,
    pub worker: Option<WorkerHandle>,
}

impl WorkerSlot {
    pub fn new(worker: WorkerHandle) -> Self {
        Self {
            generation: 0,
            state: SlotState::Starting,
            worker: Some(worker),
        }
    }

    /// Stop the current worker, if any
    pub fn terminate_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
    }
}
