//! Fingerprint-keyed cache for derived mesh quantities.
//!
//! Every derived structure (adjacency, topology results, mass properties)
//! is memoized here, tagged with the content fingerprint of the geometry it
//! was computed from. A single mutation invalidates the entire cache:
//! granularity is traded for correctness simplicity.

use core::any::Any;

use hashbrown::HashMap;
use tracing::trace;

/// Per-mesh cache of derived values.
///
/// Entries are stored as `Box<dyn Any>` keyed by a static name and are valid
/// only for the fingerprint they were computed against. The cache never hands
/// back a value tagged with a different fingerprint than the caller's: a
/// mismatch discards every entry before lookup.
///
/// Producers must not re-enter the cache; the owning mesh computes
/// prerequisites (e.g. adjacency) before memoizing dependents.
#[derive(Default)]
pub(crate) struct InvariantCache {
    fingerprint: u64,
    entries: HashMap<&'static str, Box<dyn Any>>,
}

impl InvariantCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Return the memoized value for `key`, recomputing via `produce` if the
    /// fingerprint changed or the key is absent.
    pub(crate) fn get_or_compute<T, F>(&mut self, fingerprint: u64, key: &'static str, produce: F) -> T
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        if self.fingerprint != fingerprint {
            trace!(
                old = self.fingerprint,
                new = fingerprint,
                "fingerprint changed; dropping {} cached entries",
                self.entries.len()
            );
            self.entries.clear();
            self.fingerprint = fingerprint;
        }

        if let Some(entry) = self.entries.get(key) {
            if let Some(value) = entry.downcast_ref::<T>() {
                return value.clone();
            }
            // A key registered under two types is a programming defect, not
            // a user-facing condition. Recompute in release builds.
            debug_assert!(false, "cache key {key:?} reused with a different type");
        }

        let value = produce();
        self.entries.insert(key, Box::new(value.clone()));
        value
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
