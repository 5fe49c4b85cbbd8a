//! Pool sizing.

use std::thread;

/// Upper bound on workers picked automatically
pub const MAX_AUTO_POOL_SIZE: usize = 8;

/// Configuration for the worker pool
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// Number of workers (None = derive from available parallelism)
    pub pool_size: Option<usize>,
}

impl PoolConfig {
    /// Create a configuration with automatic sizing
    pub fn new() -> Self {
        Self::default()
    }

    /// Use exactly `size` workers (at least one)
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// The number of workers the pool will run
    pub fn resolved_size(&self) -> usize {
        match self.pool_size {
            Some(size) => size.max(1),
            None => {
                let parallelism = thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                pool_size_for(parallelism)
            }
        }
    }
}

/// Automatic pool size: one execution context is left for the coordinator,
/// and the total is capped to bound memory held by engine instances.
pub fn pool_size_for(parallelism: usize) -> usize {
    parallelism.saturating_sub(1).clamp(1, MAX_AUTO_POOL_SIZE)
}
