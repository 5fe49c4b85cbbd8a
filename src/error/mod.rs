//! # Error Module
//!
//! User-friendly error types for the replay ingestion core.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, worker slots, ports
//! - **Per-file failures are data** - only pool start-up aborts a batch

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum EnforcerError {
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Analysis engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by an analysis engine
///
/// These never cross the worker boundary as failures: the task-execution
/// shim turns them into "could not analyze" rows.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Engine failed to load: {0}")]
    Load(String),

    #[error("Malformed replay: {0}")]
    Parse(String),

    #[error("{check} check failed: {reason}")]
    Classify { check: String, reason: String },

    #[error("Port {port} analysis failed: {reason}")]
    Port { port: u8, reason: String },
}

/// Errors from worker pool lifecycle operations
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Worker {slot} failed to load the analysis engine: {reason}")]
    InitFailed { slot: usize, reason: String },

    #[error("Failed to spawn worker {slot}: {source}")]
    Spawn {
        slot: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker pool destroyed")]
    Destroyed,
}

/// Why a submitted task produced no report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("Worker error: worker {slot} crashed: {reason}")]
    WorkerCrashed { slot: usize, reason: String },

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Worker pool destroyed")]
    PoolDestroyed,
}

/// Errors that occur while reading or discovering batch files
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to scan {path}: {reason}")]
    Scan { path: PathBuf, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, EnforcerError>;
