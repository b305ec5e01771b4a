//! No-op median cache implementation.

use chrono::NaiveDate;
use fundamentals_core::{CacheVersion, MedianCache, Result};
use tracing::trace;

/// A median cache that doesn't store anything.
///
/// Every lookup misses and every save succeeds without effect, so each
/// median is recomputed by the aggregator's in-process tier only. Useful for
/// disabling the persistent tier or testing code paths without cache hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MedianCache for NoopCache {
    fn get_cached_median(
        &self,
        _indicator: &str,
        _report_date: NaiveDate,
        _version: &CacheVersion,
    ) -> Result<Option<f64>> {
        trace!("NoopCache: get_cached_median called, returning None");
        Ok(None)
    }

    fn save_median(
        &self,
        _indicator: &str,
        _report_date: NaiveDate,
        _value: f64,
        _version: &CacheVersion,
    ) -> Result<()> {
        trace!("NoopCache: save_median called, doing nothing");
        Ok(())
    }

    fn clear_cache(&self, _version: &CacheVersion) -> Result<usize> {
        trace!("NoopCache: clear_cache called, returning 0");
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_cache_never_hits() {
        let cache = NoopCache::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let version = CacheVersion::new("v1");

        cache.save_median("gross_margin", date, 0.3, &version).unwrap();
        assert!(
            cache
                .get_cached_median("gross_margin", date, &version)
                .unwrap()
                .is_none()
        );
        assert_eq!(cache.clear_cache(&version).unwrap(), 0);
    }

    #[test]
    fn test_noop_cache_is_copy() {
        let cache1 = NoopCache::new();
        let cache2 = cache1; // Copy
        let _cache3 = cache2; // Still works because Copy
    }
}
