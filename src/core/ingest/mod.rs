//! # Ingest Module
//!
//! Drives one batch from raw files to accounted-for results.
//!
//! ## Per-batch flow
//! 1. **Read + fingerprint** - a chunk of files in parallel (rayon), batch order kept
//! 2. **Dedup** - each file checked against the session registry, one at a time
//! 3. **Submit** - new content becomes an analysis task on the worker pool
//! 4. **Yield** - worker replies are pumped and a frame may be rendered
//! 5. **Drain** - wait for outstanding tasks, flush results, progress 1.0
//!
//! Only step 1 runs off the coordinator thread. Registry checks, counters
//! and the result buffer are touched by the coordinator alone.

mod controller;

pub use controller::IngestionController;

use crate::core::aggregator::DEFAULT_FRAME_INTERVAL;
use crate::error::IngestError;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Files read and fingerprinted between two yields
pub const DEFAULT_CHUNK_SIZE: usize = 8;

/// Configuration for batch ingestion
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Files handled per step before yielding to the host
    pub chunk_size: usize,
    /// Rendering cadence for batched result updates
    pub frame_interval: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }
}

/// Where a file's bytes come from
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Already in memory (e.g. handed over by a drop zone)
    Memory(Vec<u8>),
    /// Read from disk when the file's chunk comes up
    Path(PathBuf),
}

/// One user-supplied file
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub name: String,
    pub source: FileSource,
}

impl BatchFile {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Memory(bytes),
        }
    }

    /// A file on disk, named after its final path component
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    /// Take the file's bytes, reading from disk if needed
    pub fn read(self) -> Result<(String, Vec<u8>), IngestError> {
        match self.source {
            FileSource::Memory(bytes) => Ok((self.name, bytes)),
            FileSource::Path(path) => match fs::read(&path) {
                Ok(bytes) => Ok((self.name, bytes)),
                Err(source) => Err(IngestError::Read { path, source }),
            },
        }
    }
}
