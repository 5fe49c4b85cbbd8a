//! # Registry Module
//!
//! Session-wide record of fingerprints that have already been sent for
//! analysis.
//!
//! The registry only grows. Check and insert happen in one call through
//! `&mut self`, so two files of the same batch can never both be admitted:
//! whoever owns the registry is the single coordinator.

use crate::core::hasher::Fingerprint;
use std::collections::HashSet;

/// Tracks fingerprints seen during a session
#[derive(Debug, Default)]
pub struct DuplicateRegistry {
    seen: HashSet<Fingerprint>,
}

impl DuplicateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `fingerprint` if it has not been seen before.
    ///
    /// Returns `true` on first sight. Returns `false` without touching the
    /// registry when the fingerprint is already present.
    pub fn register_if_new(&mut self, fingerprint: &Fingerprint) -> bool {
        if self.contains(fingerprint) {
            return false;
        }
        self.seen.insert(fingerprint.clone())
    }

    /// Whether a fingerprint has been registered
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Number of distinct fingerprints registered
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::fingerprint;

    #[test]
    fn first_sight_registers() {
        let mut registry = DuplicateRegistry::new();
        let fp = fingerprint(b"x");

        assert!(registry.register_if_new(&fp));
        assert!(registry.contains(&fp));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn second_sight_is_rejected_without_mutation() {
        let mut registry = DuplicateRegistry::new();
        let fp = fingerprint(b"x");

        registry.register_if_new(&fp);
        assert!(!registry.register_if_new(&fp));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_fingerprints_are_all_admitted() {
        let mut registry = DuplicateRegistry::new();

        assert!(registry.register_if_new(&fingerprint(b"a")));
        assert!(registry.register_if_new(&fingerprint(b"b")));
        assert!(registry.register_if_new(&fingerprint(b"c")));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn new_registry_is_empty() {
        let registry = DuplicateRegistry::new();
        assert!(registry.is_empty());
    }
}
