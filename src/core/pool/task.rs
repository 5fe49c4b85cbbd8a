//! Units of work and their results.

use crate::core::engine::FileReport;
use crate::error::TaskError;
use std::fmt;

/// Session-unique, monotonically assigned task identifier
pub type TaskId = u64;

/// One file's analysis work.
///
/// The byte buffer is moved into the worker that runs the task; nothing
/// else holds it afterwards.
pub struct AnalysisTask {
    pub id: TaskId,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl AnalysisTask {
    pub fn new(id: TaskId, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id,
            filename: filename.into(),
            bytes,
        }
    }
}

impl fmt::Debug for AnalysisTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisTask")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// The single outcome delivered for a task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub outcome: Result<FileReport, TaskError>,
}

impl TaskResult {
    pub fn ok(task_id: TaskId, report: FileReport) -> Self {
        Self {
            task_id,
            outcome: Ok(report),
        }
    }

    pub fn err(task_id: TaskId, error: TaskError) -> Self {
        Self {
            task_id,
            outcome: Err(error),
        }
    }
}

/// Completion callback. `FnOnce` makes a second invocation impossible.
pub type ResultCallback = Box<dyn FnOnce(TaskResult) + Send>;
