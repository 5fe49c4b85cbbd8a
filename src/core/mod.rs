//! # Core Module
//!
//! The UI-agnostic replay ingestion engine.
//!
//! ## Modules
//! - `scanner` - Discovers replay files in directories
//! - `hasher` - Computes content fingerprints
//! - `registry` - Remembers every fingerprint seen this session
//! - `engine` - The analysis engine seam and its display records
//! - `pool` - Crash-isolated worker threads that run the engine
//! - `ingest` - Drives a batch from files to results
//! - `aggregator` - Paces result rows into frame-sized display updates
//! - `session` - Ties the above together for one user session

pub mod aggregator;
pub mod engine;
pub mod hasher;
pub mod ingest;
pub mod pool;
pub mod registry;
pub mod scanner;
pub mod session;

// Re-export commonly used types
pub use aggregator::{ReportStats, ResultAggregator};
pub use engine::{AnalysisEngine, EngineFactory, FileReport, OverallStatus};
pub use hasher::{fingerprint, Fingerprint};
pub use ingest::{BatchFile, FileSource, IngestConfig};
pub use pool::{PoolConfig, PoolStatus, WorkerPool};
pub use registry::DuplicateRegistry;
pub use session::{Session, SessionBuilder};
