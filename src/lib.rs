//! # Replay Enforcer
//!
//! Batch ingestion core for replay analysis: deduplicates uploaded files by
//! content, fans analysis out to a fixed pool of crash-isolated workers and
//! streams paced progress/result updates to a display layer.
//!
//! ## Guarantees
//! - **Exactly once** - every submitted task yields exactly one result
//! - **Isolation** - a crashing worker only fails its own in-flight task
//! - **Always finishes** - progress reaches 100% whatever the duplicate/error mix
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - hashing, dedup, worker pool, ingestion and result aggregation
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{EnforcerError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
