//! Cross-sectional aggregation over market samples.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use fundamentals_core::{
    CacheVersion, Distribution, DistributionStatistics, FundamentalsError, MedianCache, Result,
};
use tracing::{debug, instrument, warn};

use crate::statistics::{
    empirical_cdf, histogram, mean, median_sorted, population_std, quantile_sorted, sorted,
    valid_values,
};

/// Default number of histogram bins for [`MarketAggregator::compute_distribution`].
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MedianKey {
    indicator: String,
    report_date: NaiveDate,
    version: CacheVersion,
}

/// Computes market medians, percentiles and distributions for one analysis
/// session.
///
/// Medians go through two cache tiers: an in-process map owned by this
/// instance, in front of a persistent [`MedianCache`]. A freshly computed
/// median is written to the persistent tier first and only then memoized, so
/// the in-process tier never holds a value the store has not seen.
///
/// Percentiles and distributions depend on more than the cache key and are
/// always computed fresh.
pub struct MarketAggregator {
    store: Arc<dyn MedianCache>,
    memo: RwLock<HashMap<MedianKey, f64>>,
}

impl std::fmt::Debug for MarketAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketAggregator")
            .field(
                "memoized",
                &self.memo.read().map(|memo| memo.len()).unwrap_or_default(),
            )
            .finish_non_exhaustive()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> FundamentalsError {
    FundamentalsError::Storage(format!("median memo lock poisoned: {e}"))
}

impl MarketAggregator {
    /// Creates an aggregator with an empty in-process tier.
    #[must_use]
    pub fn new(store: Arc<dyn MedianCache>) -> Self {
        Self {
            store,
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Median of the valid part of `sample`, cached under
    /// `(indicator, report_date, version)`.
    ///
    /// Returns `Ok(None)` when the sample has no valid values. A cached value
    /// is returned as-is, even if `sample` differs from the one it was
    /// computed from. After a fresh computation the persistent tier is read
    /// back, so a value stored concurrently by another session is the one
    /// memoized and returned.
    ///
    /// # Errors
    /// Returns an error only if the persistent tier fails.
    #[instrument(skip(self, sample), fields(version = %version, sample_len = sample.len()))]
    pub fn compute_median(
        &self,
        indicator: &str,
        report_date: NaiveDate,
        sample: &[Option<f64>],
        version: &CacheVersion,
    ) -> Result<Option<f64>> {
        let key = MedianKey {
            indicator: indicator.to_string(),
            report_date,
            version: version.clone(),
        };

        if let Some(value) = self.memo.read().map_err(lock_error)?.get(&key) {
            debug!("In-process median hit");
            return Ok(Some(*value));
        }

        if let Some(value) = self
            .store
            .get_cached_median(indicator, report_date, version)?
        {
            debug!("Persistent median hit");
            self.memo.write().map_err(lock_error)?.insert(key, value);
            return Ok(Some(value));
        }

        let values = sorted(valid_values(sample));
        let Some(median) = median_sorted(&values) else {
            debug!("No valid values in sample");
            return Ok(None);
        };
        if !median.is_finite() {
            warn!("Median is not finite, treating as missing");
            return Ok(None);
        }

        self.store
            .save_median(indicator, report_date, median, version)?;

        // A concurrent writer may have stored the key first; its value wins
        let stored = self
            .store
            .get_cached_median(indicator, report_date, version)?
            .unwrap_or(median);
        if stored != median {
            debug!(median, stored, "Lost median write race, using stored value");
        }
        self.memo.write().map_err(lock_error)?.insert(key, stored);
        debug!(median = stored, count = values.len(), "Computed median");
        Ok(Some(stored))
    }

    /// Share of the valid part of `sample` at or below `value`, in `[0, 1]`.
    ///
    /// `value` need not be a member of the sample. Returns `None` when the
    /// sample has no valid values or `value` is NaN.
    #[must_use]
    pub fn compute_percentile(&self, value: f64, sample: &[Option<f64>]) -> Option<f64> {
        empirical_cdf(value, &valid_values(sample))
    }

    /// Histogram and descriptive statistics of the valid part of `sample`.
    ///
    /// Quartiles here are linearly interpolated order statistics, unlike the
    /// empirical CDF of [`MarketAggregator::compute_percentile`]. Returns
    /// `None` when the sample has no valid values or `bin_count` is zero.
    #[must_use]
    pub fn compute_distribution(
        &self,
        sample: &[Option<f64>],
        bin_count: usize,
    ) -> Option<Distribution> {
        let values = sorted(valid_values(sample));
        let (histogram, bin_edges) = histogram(&values, bin_count)?;

        let statistics = DistributionStatistics {
            mean: mean(&values)?,
            median: median_sorted(&values)?,
            std: population_std(&values)?,
            min: *values.first()?,
            max: *values.last()?,
            q25: quantile_sorted(&values, 0.25)?,
            q75: quantile_sorted(&values, 0.75)?,
            count: values.len(),
        };

        Some(Distribution {
            histogram,
            bin_edges,
            statistics,
        })
    }

    /// Drops every median cached under `version` from both tiers.
    ///
    /// Returns the number of persistent entries removed.
    ///
    /// # Errors
    /// Returns an error if the persistent tier fails.
    pub fn clear_cache(&self, version: &CacheVersion) -> Result<usize> {
        self.memo
            .write()
            .map_err(lock_error)?
            .retain(|key, _| &key.version != version);
        let removed = self.store.clear_cache(version)?;
        debug!(version = %version, removed, "Cleared median cache");
        Ok(removed)
    }

    /// Number of medians held in the in-process tier.
    #[must_use]
    pub fn memoized_count(&self) -> usize {
        self.memo.read().map(|memo| memo.len()).unwrap_or_default()
    }
}
