//! File filtering logic for the scanner.

use std::collections::HashSet;
use std::path::Path;

/// Extension of Slippi replay files
pub const REPLAY_EXTENSION: &str = "slp";

/// Decides which discovered files are replays
pub struct ReplayFilter {
    extensions: HashSet<String>,
    include_hidden: bool,
}

impl ReplayFilter {
    pub fn new() -> Self {
        Self {
            extensions: std::iter::once(REPLAY_EXTENSION.to_string()).collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    pub fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with('.'))
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && Self::is_hidden(path) {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

impl Default for ReplayFilter {
    fn default() -> Self {
        Self::new()
    }
}
