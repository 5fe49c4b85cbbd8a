//! # Engine Module
//!
//! The seam to the external analysis engine and the display record built
//! from its answers.
//!
//! ## Contents
//! - `traits` - the engine capability set and the factory that builds one per worker
//! - `types` - settings, checks and violations as the engine reports them
//! - `report` - the per-file row handed to the display layer
//! - `execute` - the task-execution shim that runs inside a worker
//!
//! The engine itself (replay parsing, rule detection) lives outside this
//! crate. Anything implementing [`AnalysisEngine`] can be plugged in.

mod execute;
mod report;
mod traits;
mod types;

pub use execute::run_checks;
pub use report::{
    CheckRow, CheckStatus, ControllerKind, FileReport, OverallStatus, PortIdentity, PortStatus,
    ReportCategory, ViolationRow, PORT_COUNT,
};
pub use traits::{AnalysisEngine, EngineFactory};
pub use types::{
    CheckKey, CheckOutcome, CheckResults, ControllerType, GameSettings, PlayerKind,
    PlayerSettings, Violation,
};
