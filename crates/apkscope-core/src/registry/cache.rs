//! Caller-owned cache of package records.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::PoisonError;

use lru::LruCache;
use tracing::trace;

use crate::Result;
use crate::registry::PackageRecord;
use crate::registry::PackageRegistry;

/// Advisory cache of registry lookups, keyed by package id.
///
/// A hit returns whatever was stored last, however old; a miss falls
/// through to the registry exactly like a cold start. Callers decide when
/// to [`invalidate`](Self::invalidate) or [`clear`](Self::clear) it.
#[derive(Debug)]
pub struct PackageCache {
    entries: Mutex<LruCache<String, PackageRecord>>,
}

impl PackageCache {
    /// Creates a cache holding at most `capacity` records (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns a cached record.
    pub fn get(&self, id: &str) -> Option<PackageRecord> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(id).cloned()
    }

    /// Stores a record, replacing any previous one for the same id.
    pub fn insert(&self, record: PackageRecord) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(record.id.clone(), record);
    }

    /// Fills the cache from a full enumeration.
    pub fn extend(&self, records: impl IntoIterator<Item = PackageRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    /// Drops one record.
    pub fn invalidate(&self, id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.pop(id);
    }

    /// Drops every record.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached record or asks the registry and caches the answer.
    pub fn lookup<R: PackageRegistry + ?Sized>(
        &self,
        registry: &R,
        id: &str,
    ) -> Result<PackageRecord> {
        if let Some(record) = self.get(id) {
            trace!(package = id, "package cache hit");
            return Ok(record);
        }
        let record = registry.package(id)?;
        self.insert(record.clone());
        Ok(record)
    }
}

impl Default for PackageCache {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::InspectError;
    use crate::registry::EnabledSetting;
    use std::cell::Cell;

    struct CountingRegistry {
        calls: Cell<usize>,
    }

    impl PackageRegistry for CountingRegistry {
        fn package(&self, id: &str) -> Result<PackageRecord> {
            self.calls.set(self.calls.get() + 1);
            if id == "missing" {
                return Err(InspectError::PackageNotFound { id: id.into() });
            }
            Ok(PackageRecord::new(id, "/data/app/base.apk"))
        }

        fn installed_packages(&self) -> Result<Vec<PackageRecord>> {
            Ok(Vec::new())
        }

        fn component_enabled_setting(&self, _: &str, _: &str) -> Result<EnabledSetting> {
            Ok(EnabledSetting::Default)
        }
    }

    #[test]
    fn test_lookup_caches() {
        let registry = CountingRegistry { calls: Cell::new(0) };
        let cache = PackageCache::new(4);

        cache.lookup(&registry, "com.a").unwrap();
        cache.lookup(&registry, "com.a").unwrap();
        assert_eq!(registry.calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let registry = CountingRegistry { calls: Cell::new(0) };
        let cache = PackageCache::new(4);

        cache.lookup(&registry, "com.a").unwrap();
        cache.invalidate("com.a");
        cache.lookup(&registry, "com.a").unwrap();
        assert_eq!(registry.calls.get(), 2);
    }

    #[test]
    fn test_miss_errors_are_not_cached() {
        let registry = CountingRegistry { calls: Cell::new(0) };
        let cache = PackageCache::new(4);

        assert!(cache.lookup(&registry, "missing").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = PackageCache::new(2);
        cache.insert(PackageRecord::new("a", "/a.apk"));
        cache.insert(PackageRecord::new("b", "/b.apk"));
        cache.insert(PackageRecord::new("c", "/c.apk"));
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = PackageCache::new(0);
        cache.insert(PackageRecord::new("a", "/a.apk"));
        assert_eq!(cache.len(), 1);
    }
}
