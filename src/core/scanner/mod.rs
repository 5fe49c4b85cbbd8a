//! # Scanner Module
//!
//! Discovers Slippi replay files (`.slp`) in directories and turns them
//! into a batch.
//!
//! ## Example
//! ```rust,ignore
//! use replay_enforcer::core::scanner::{collect_batch, ScanConfig};
//!
//! let scan = collect_batch(&["/Users/me/Slippi".into()], &ScanConfig::default());
//! let summary = session.process_batch(scan.into_batch())?;
//! ```

mod filter;
mod walker;

pub use filter::{ReplayFilter, REPLAY_EXTENSION};
pub use walker::{ScanConfig, WalkDirScanner};

use crate::core::ingest::BatchFile;
use crate::error::IngestError;
use std::path::PathBuf;

/// Result of a scan operation
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Discovered replays, sorted by path
    pub replays: Vec<PathBuf>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<IngestError>,
}

impl ScanResult {
    /// The discovered replays as a batch, read lazily chunk by chunk
    pub fn into_batch(self) -> Vec<BatchFile> {
        self.replays.into_iter().map(BatchFile::from_path).collect()
    }
}

/// Scan `paths` with `config`
pub fn collect_batch(paths: &[PathBuf], config: &ScanConfig) -> ScanResult {
    WalkDirScanner::new(config.clone()).scan(paths)
}
