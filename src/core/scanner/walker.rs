//! Directory walking implementation using walkdir.

use super::{filter::ReplayFilter, ScanResult};
use crate::error::IngestError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for replay discovery
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Custom extensions to include (None = `.slp` only)
    pub extensions: Option<Vec<String>>,
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ReplayFilter,
}

impl WalkDirScanner {
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ReplayFilter::new().with_hidden(config.include_hidden);
        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }
        Self { config, filter }
    }

    /// Expand `paths` into replay files.
    ///
    /// Directories are walked; a path naming a file is taken as is, since
    /// the user picked it explicitly. Missing paths and unreadable
    /// directory entries are recorded as errors without stopping the scan.
    pub fn scan(&self, paths: &[PathBuf]) -> ScanResult {
        let mut result = ScanResult::default();

        for path in paths {
            if path.is_file() {
                result.replays.push(path.clone());
            } else if path.is_dir() {
                self.scan_directory(path, &mut result);
            } else {
                warn!(path = %path.display(), "Path does not exist");
                result
                    .errors
                    .push(IngestError::DirectoryNotFound { path: path.clone() });
            }
        }

        result.replays.sort();
        result.replays.dedup();
        debug!(replays = result.replays.len(), errors = result.errors.len(), "Scan complete");
        result
    }

    fn scan_directory(&self, root: &Path, result: &mut ScanResult) {
        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let include_hidden = self.config.include_hidden;
        let entries = walker.into_iter().filter_entry(|entry| {
            include_hidden
                || entry.depth() == 0
                || !entry.file_type().is_dir()
                || !ReplayFilter::is_hidden(entry.path())
        });

        for entry in entries {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        continue;
                    }
                    if self.filter.should_include(entry.path()) {
                        result.replays.push(entry.into_path());
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    result.errors.push(IngestError::Scan {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}
