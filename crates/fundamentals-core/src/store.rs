//! Persistence seams consumed by the analysis pipeline.
//!
//! This module defines the two narrow interfaces the analysis engine needs
//! from storage:
//!
//! - [`MedianCache`] - versioned market-median cache entries
//! - [`StatementStore`] - per-company and per-date statement queries

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::Result,
    types::{CacheVersion, CompanyStatements, MarketStatements, StockCode},
};

/// Persistent tier of the market-median cache.
///
/// Entries are keyed by `(indicator, report_date, version)` and are never
/// mutated once written. Implementations must treat a second write for an
/// existing key as a successful no-op: concurrent sessions may race to store
/// the same median and the loser must not see an error.
pub trait MedianCache: Send + Sync {
    /// Retrieves a cached median.
    ///
    /// Returns `Ok(Some(median))` if cached, `Ok(None)` if not cached.
    fn get_cached_median(
        &self,
        indicator: &str,
        report_date: NaiveDate,
        version: &CacheVersion,
    ) -> Result<Option<f64>>;

    /// Stores a median unless an entry already exists for the key.
    fn save_median(
        &self,
        indicator: &str,
        report_date: NaiveDate,
        value: f64,
        version: &CacheVersion,
    ) -> Result<()>;

    /// Removes every entry stored under `version`.
    ///
    /// Returns the number of entries removed.
    fn clear_cache(&self, version: &CacheVersion) -> Result<usize>;
}

/// Queryable store of per-entity, per-period statement rows.
#[async_trait]
pub trait StatementStore: Send + Sync {
    /// Returns true if any balance sheet has been stored.
    async fn has_data(&self) -> Result<bool>;

    /// Fetches a company's statements with report dates in `[start, end]`,
    /// each statement type ordered by ascending report date.
    async fn query_company_periods(
        &self,
        stock_code: &StockCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CompanyStatements>;

    /// Fetches every entity's statements for one report date.
    async fn query_market_statements(&self, report_date: NaiveDate) -> Result<MarketStatements>;

    /// Looks up a company's display name.
    ///
    /// Returns `Ok(None)` if the store has no name for the code.
    async fn company_name(&self, stock_code: &StockCode) -> Result<Option<String>>;
}
