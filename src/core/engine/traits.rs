//! Trait definitions for the analysis engine.

use super::types::{CheckResults, ControllerType, GameSettings};
use crate::error::EngineError;

/// Capability set of an analysis engine instance.
///
/// One instance lives inside each worker and is only ever touched by that
/// worker's thread, so implementations need `Send` but not `Sync`.
pub trait AnalysisEngine: Send {
    /// Load or prepare the engine. Called once per worker before any task.
    fn initialize(&mut self) -> Result<(), EngineError>;

    /// Read the game settings block
    fn parse_settings(&self, bytes: &[u8]) -> Result<GameSettings, EngineError>;

    /// Whether the replay predates the minimum supported recorder version
    fn version_too_old(&self, bytes: &[u8]) -> Result<bool, EngineError>;

    /// Whether the replay is a warm-up game that should not be judged
    fn special_condition(&self, bytes: &[u8]) -> Result<bool, EngineError>;

    /// Classify the controller used on `port`
    fn controller_type(&self, bytes: &[u8], port: u8) -> Result<ControllerType, EngineError>;

    /// Run every rule check for `port`
    fn run_all_checks(&self, bytes: &[u8], port: u8) -> Result<CheckResults, EngineError>;
}

/// Builds fresh engine instances for workers and their replacements
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn AnalysisEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Box<dyn AnalysisEngine> + Send + Sync,
{
    fn create(&self) -> Box<dyn AnalysisEngine> {
        self()
    }
}
