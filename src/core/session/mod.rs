//! # Session Module
//!
//! One user session: everything that outlives a single batch.
//!
//! ## Lifetime
//! - The duplicate registry only grows; a file seen in any earlier batch is
//!   a duplicate in every later one
//! - The worker pool is started by the first batch and kept warm after that
//! - `end()` (or dropping the session) destroys the pool
//!
//! ## Example
//! ```rust,ignore
//! use replay_enforcer::core::session::Session;
//!
//! let mut session = Session::builder().engine(factory).pool_size(4).build()?;
//! let summary = session.process_batch(files)?;
//! println!("{} analyzed, {} duplicates", summary.analyzed, summary.duplicates);
//! ```

use crate::core::aggregator::{ReportStats, ResultAggregator};
use crate::core::engine::{EngineFactory, FileReport};
use crate::core::ingest::{BatchFile, IngestConfig, IngestionController};
use crate::core::pool::{PoolConfig, PoolStatus, WorkerPool};
use crate::core::registry::DuplicateRegistry;
use crate::error::{EnforcerError, PoolError, Result};
use crate::events::{null_sender, BatchSummary, EventSender};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Builder for a [`Session`]
pub struct SessionBuilder {
    factory: Option<Arc<dyn EngineFactory>>,
    pool: PoolConfig,
    ingest: IngestConfig,
    events: Option<EventSender>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            factory: None,
            pool: PoolConfig::default(),
            ingest: IngestConfig::default(),
            events: None,
        }
    }

    /// Set the analysis engine every worker hosts (required)
    pub fn engine<F: EngineFactory + 'static>(mut self, factory: F) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Set the number of workers (default: derived from available cores)
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool = self.pool.pool_size(size);
        self
    }

    /// Set how many files are read and fingerprinted between yields
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.ingest.chunk_size = size.max(1);
        self
    }

    /// Set the rendering cadence for batched result updates
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.ingest.frame_interval = interval;
        self
    }

    /// Send progress, pool and result events to `events`
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the session
    pub fn build(self) -> Result<Session> {
        let factory = self
            .factory
            .ok_or_else(|| EnforcerError::Config("no analysis engine configured".to_string()))?;
        let events = self.events.unwrap_or_else(null_sender);

        Ok(Session {
            id: Uuid::new_v4(),
            registry: DuplicateRegistry::new(),
            aggregator: ResultAggregator::new(events.clone()),
            controller: IngestionController::new(self.ingest, events.clone()),
            pool: None,
            factory,
            pool_config: self.pool,
            events,
            ended: false,
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Long-lived ingestion state for one user session
pub struct Session {
    id: Uuid,
    registry: DuplicateRegistry,
    aggregator: ResultAggregator,
    controller: IngestionController,
    pool: Option<WorkerPool>,
    factory: Arc<dyn EngineFactory>,
    pool_config: PoolConfig,
    events: EventSender,
    ended: bool,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Process one batch of files to completion.
    ///
    /// Starts the worker pool on first use. If the engine cannot be loaded
    /// the batch is abandoned before any task runs; the next batch tries
    /// again with a fresh pool.
    pub fn process_batch(&mut self, files: Vec<BatchFile>) -> Result<BatchSummary> {
        if self.ended {
            return Err(PoolError::Destroyed.into());
        }

        let pool = match self.pool.take() {
            Some(pool) => pool,
            None => {
                let mut pool = WorkerPool::new(
                    &self.pool_config,
                    Arc::clone(&self.factory),
                    self.events.clone(),
                );
                if let Err(e) = pool.initialize() {
                    error!(session = %self.id, error = %e, "Could not start analysis workers");
                    return Err(e.into());
                }
                pool
            }
        };
        let pool = self.pool.insert(pool);

        Ok(self
            .controller
            .process_batch(files, &mut self.registry, pool, &mut self.aggregator))
    }

    /// Every row shown so far, across batches
    pub fn displayed(&self) -> &[FileReport] {
        self.aggregator.displayed()
    }

    pub fn stats(&self) -> ReportStats {
        self.aggregator.stats()
    }

    /// Distinct file contents seen this session
    pub fn known_fingerprints(&self) -> usize {
        self.registry.len()
    }

    /// Worker pool state, once started
    pub fn pool_status(&self) -> Option<PoolStatus> {
        self.pool.as_ref().map(WorkerPool::status)
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// End the session and destroy the worker pool. Idempotent.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        if let Some(pool) = self.pool.as_mut() {
            pool.destroy();
        }
        info!(session = %self.id, "Session ended");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{
        AnalysisEngine, CheckResults, ControllerType, GameSettings, OverallStatus,
    };
    use crate::error::EngineError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// The first `fail_first` engines created refuse to load
    struct FlakyEngine {
        attempt: usize,
        fail_first: usize,
    }

    impl AnalysisEngine for FlakyEngine {
        fn initialize(&mut self) -> std::result::Result<(), EngineError> {
            if self.attempt < self.fail_first {
                return Err(EngineError::Load("module not found".to_string()));
            }
            Ok(())
        }

        fn parse_settings(&self, _bytes: &[u8]) -> std::result::Result<GameSettings, EngineError> {
            Ok(GameSettings::default())
        }

        fn version_too_old(&self, _bytes: &[u8]) -> std::result::Result<bool, EngineError> {
            Ok(false)
        }

        fn special_condition(&self, _bytes: &[u8]) -> std::result::Result<bool, EngineError> {
            Ok(false)
        }

        fn controller_type(
            &self,
            _bytes: &[u8],
            _port: u8,
        ) -> std::result::Result<ControllerType, EngineError> {
            Ok(ControllerType::Digital)
        }

        fn run_all_checks(
            &self,
            _bytes: &[u8],
            _port: u8,
        ) -> std::result::Result<CheckResults, EngineError> {
            Ok(CheckResults::new())
        }
    }

    fn flaky(fail_first: usize) -> impl Fn() -> Box<dyn AnalysisEngine> + Send + Sync {
        let loads = AtomicUsize::new(0);
        move || {
            let attempt = loads.fetch_add(1, Ordering::SeqCst);
            Box::new(FlakyEngine {
                attempt,
                fail_first,
            }) as Box<dyn AnalysisEngine>
        }
    }

    #[test]
    fn build_requires_an_engine() {
        let result = Session::builder().pool_size(1).build();
        assert!(matches!(result, Err(EnforcerError::Config(_))));
    }

    #[test]
    fn pool_starts_on_first_batch() {
        let mut session = Session::builder().engine(flaky(0)).pool_size(2).build().unwrap();
        assert!(session.pool_status().is_none());

        let summary = session
            .process_batch(vec![BatchFile::from_bytes("a.slp", b"a".to_vec())])
            .unwrap();

        assert_eq!(summary.analyzed, 1);
        assert_eq!(session.pool_status().unwrap().size, 2);
        assert_eq!(session.known_fingerprints(), 1);
        assert_eq!(session.displayed()[0].overall, OverallStatus::Passed);
    }

    #[test]
    fn failed_start_aborts_batch_and_next_batch_retries() {
        let mut session = Session::builder().engine(flaky(1)).pool_size(1).build().unwrap();
        let files = || vec![BatchFile::from_bytes("a.slp", b"a".to_vec())];

        let first = session.process_batch(files());
        assert!(matches!(
            first,
            Err(EnforcerError::Pool(PoolError::InitFailed { .. }))
        ));
        assert!(session.pool_status().is_none());
        assert!(session.displayed().is_empty());
        assert_eq!(session.known_fingerprints(), 0);

        let second = session.process_batch(files()).unwrap();
        assert_eq!(second.analyzed, 1);
    }

    #[test]
    fn ended_session_rejects_batches() {
        let mut session = Session::builder().engine(flaky(0)).pool_size(1).build().unwrap();
        session
            .process_batch(vec![BatchFile::from_bytes("a.slp", b"a".to_vec())])
            .unwrap();

        session.end();
        session.end();

        assert!(session.is_ended());
        let result = session.process_batch(vec![BatchFile::from_bytes("b.slp", b"b".to_vec())]);
        assert!(matches!(result, Err(EnforcerError::Pool(PoolError::Destroyed))));
    }
}
