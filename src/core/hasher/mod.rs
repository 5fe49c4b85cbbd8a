//! # Hasher Module
//!
//! Computes content fingerprints for replay files.
//!
//! ## How It Works
//! The fingerprint is the BLAKE3 digest of the file bytes rendered as
//! 64 lowercase hex characters. It depends on the bytes alone: the same
//! content under two different filenames yields the same fingerprint.
//!
//! ## Example
//! ```rust,ignore
//! use replay_enforcer::core::hasher::fingerprint;
//!
//! let fp = fingerprint(&bytes);
//! println!("{}", fp);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a rendered fingerprint in characters
pub const FINGERPRINT_LEN: usize = 64;

/// Content-derived identity of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Get the hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for logs and terminal output
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a byte buffer
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    Fingerprint(blake3::hash(bytes).to_hex().to_string())
}
