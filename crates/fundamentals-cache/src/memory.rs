//! In-memory store implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use fundamentals_core::{
    BalanceSheetRow, CacheVersion, CashFlowRow, CompanyStatements, FundamentalsError,
    IncomeStatementRow, MarketStatements, MedianCache, Result, StatementRecord, StatementStore,
    StockCode,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument};

/// Key for median cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MedianKey {
    indicator: String,
    report_date: NaiveDate,
    version: String,
}

impl MedianKey {
    fn new(indicator: &str, report_date: NaiveDate, version: &CacheVersion) -> Self {
        Self {
            indicator: indicator.to_string(),
            report_date,
            version: version.as_str().to_string(),
        }
    }
}

/// Statement rows of one type keyed by `(stock_code, report_date)`.
type Table<R> = RwLock<BTreeMap<(StockCode, NaiveDate), R>>;

/// Simple in-memory store for testing and development.
///
/// Data is stored in `RwLock`-protected maps and is lost when the store is
/// dropped. Rows are cloned on get/put operations. Both the statement and the
/// median tables keep the first row written for a key.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    medians: RwLock<HashMap<MedianKey, f64>>,
    median_writes: AtomicUsize,
    median_save_calls: AtomicUsize,
    balance_sheets: Table<BalanceSheetRow>,
    income_statements: Table<IncomeStatementRow>,
    cash_flows: Table<CashFlowRow>,
    names: RwLock<HashMap<StockCode, String>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of median entries actually written (duplicates excluded).
    #[must_use]
    pub fn median_write_count(&self) -> usize {
        self.median_writes.load(Ordering::SeqCst)
    }

    /// Number of `save_median` calls, duplicates included.
    #[must_use]
    pub fn median_save_calls(&self) -> usize {
        self.median_save_calls.load(Ordering::SeqCst)
    }

    /// Number of median entries currently held across all versions.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn median_count(&self) -> Result<usize> {
        Ok(self.medians.read().map_err(lock_error)?.len())
    }

    /// Stores balance sheets, skipping rows whose key already exists.
    ///
    /// Returns `(added, skipped)`.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn put_balance_sheets(&self, rows: &[BalanceSheetRow]) -> Result<(usize, usize)> {
        insert_rows(&self.balance_sheets, rows)
    }

    /// Stores income statements, skipping rows whose key already exists.
    ///
    /// Returns `(added, skipped)`.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn put_income_statements(&self, rows: &[IncomeStatementRow]) -> Result<(usize, usize)> {
        insert_rows(&self.income_statements, rows)
    }

    /// Stores cash flow statements, skipping rows whose key already exists.
    ///
    /// Returns `(added, skipped)`.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn put_cash_flows(&self, rows: &[CashFlowRow]) -> Result<(usize, usize)> {
        insert_rows(&self.cash_flows, rows)
    }

    /// Records a company's display name.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn put_company_name(&self, stock_code: &StockCode, name: impl Into<String>) -> Result<()> {
        self.names
            .write()
            .map_err(lock_error)?
            .insert(stock_code.clone(), name.into());
        Ok(())
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> FundamentalsError {
    FundamentalsError::Storage(e.to_string())
}

fn insert_rows<R: StatementRecord>(table: &Table<R>, rows: &[R]) -> Result<(usize, usize)> {
    let mut table = table.write().map_err(lock_error)?;
    let mut added = 0usize;
    let mut skipped = 0usize;

    for row in rows {
        let key = (row.stock_code().clone(), row.report_date());
        if table.contains_key(&key) {
            skipped += 1;
        } else {
            table.insert(key, row.clone());
            added += 1;
        }
    }

    debug!(added, skipped, "Stored {:?} rows", R::KIND);
    Ok((added, skipped))
}

fn company_rows<R: StatementRecord>(
    table: &Table<R>,
    stock_code: &StockCode,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<R>> {
    let table = table.read().map_err(lock_error)?;
    Ok(table
        .range((stock_code.clone(), start)..=(stock_code.clone(), end))
        .map(|(_, row)| row.clone())
        .collect())
}

fn market_rows<R: StatementRecord>(table: &Table<R>, report_date: NaiveDate) -> Result<Vec<R>> {
    let table = table.read().map_err(lock_error)?;
    Ok(table
        .iter()
        .filter(|((_, date), _)| *date == report_date)
        .map(|(_, row)| row.clone())
        .collect())
}

impl MedianCache for InMemoryStore {
    #[instrument(skip(self), fields(version = %version))]
    fn get_cached_median(
        &self,
        indicator: &str,
        report_date: NaiveDate,
        version: &CacheVersion,
    ) -> Result<Option<f64>> {
        let key = MedianKey::new(indicator, report_date, version);
        let cache = self.medians.read().map_err(lock_error)?;
        match cache.get(&key) {
            Some(value) => {
                debug!("Cache hit for median");
                Ok(Some(*value))
            }
            None => {
                debug!("Cache miss for median");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self), fields(version = %version))]
    fn save_median(
        &self,
        indicator: &str,
        report_date: NaiveDate,
        value: f64,
        version: &CacheVersion,
    ) -> Result<()> {
        self.median_save_calls.fetch_add(1, Ordering::SeqCst);
        let key = MedianKey::new(indicator, report_date, version);
        let mut cache = self.medians.write().map_err(lock_error)?;
        if cache.contains_key(&key) {
            debug!("Median already cached, keeping first value");
            return Ok(());
        }
        cache.insert(key, value);
        self.median_writes.fetch_add(1, Ordering::SeqCst);
        debug!("Cached median");
        Ok(())
    }

    #[instrument(skip(self), fields(version = %version))]
    fn clear_cache(&self, version: &CacheVersion) -> Result<usize> {
        let mut cache = self.medians.write().map_err(lock_error)?;
        let before = cache.len();
        cache.retain(|key, _| key.version != version.as_str());
        let removed = before - cache.len();
        debug!("Cleared {} cached medians", removed);
        Ok(removed)
    }
}

#[async_trait]
impl StatementStore for InMemoryStore {
    async fn has_data(&self) -> Result<bool> {
        Ok(!self.balance_sheets.read().map_err(lock_error)?.is_empty())
    }

    #[instrument(skip(self), fields(stock_code = %stock_code))]
    async fn query_company_periods(
        &self,
        stock_code: &StockCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CompanyStatements> {
        if start > end {
            return Ok(CompanyStatements::new(stock_code.clone()));
        }
        Ok(CompanyStatements {
            stock_code: stock_code.clone(),
            balance_sheets: company_rows(&self.balance_sheets, stock_code, start, end)?,
            income_statements: company_rows(&self.income_statements, stock_code, start, end)?,
            cash_flows: company_rows(&self.cash_flows, stock_code, start, end)?,
        })
    }

    #[instrument(skip(self))]
    async fn query_market_statements(&self, report_date: NaiveDate) -> Result<MarketStatements> {
        Ok(MarketStatements {
            report_date,
            balance_sheets: market_rows(&self.balance_sheets, report_date)?,
            income_statements: market_rows(&self.income_statements, report_date)?,
            cash_flows: market_rows(&self.cash_flows, report_date)?,
        })
    }

    async fn company_name(&self, stock_code: &StockCode) -> Result<Option<String>> {
        Ok(self.names.read().map_err(lock_error)?.get(stock_code).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_memory_cache_median() {
        let store = InMemoryStore::new();
        let version = CacheVersion::new("v1");
        let report_date = date(2024, 3, 31);

        // Initially no data
        let result = store
            .get_cached_median("gross_margin", report_date, &version)
            .unwrap();
        assert!(result.is_none());

        store
            .save_median("gross_margin", report_date, 0.3, &version)
            .unwrap();

        let result = store
            .get_cached_median("gross_margin", report_date, &version)
            .unwrap();
        assert_eq!(result, Some(0.3));
    }

    #[test]
    fn test_duplicate_median_write_is_noop() {
        let store = InMemoryStore::new();
        let version = CacheVersion::new("v1");
        let report_date = date(2024, 3, 31);

        store.save_median("roe", report_date, 0.1, &version).unwrap();
        store.save_median("roe", report_date, 0.9, &version).unwrap();

        assert_eq!(store.median_write_count(), 1);
        assert_eq!(store.median_save_calls(), 2);
        assert_eq!(
            store.get_cached_median("roe", report_date, &version).unwrap(),
            Some(0.1)
        );
    }

    #[test]
    fn test_clear_cache_only_removes_version() {
        let store = InMemoryStore::new();
        let v1 = CacheVersion::new("v1");
        let v2 = CacheVersion::new("v2");
        let report_date = date(2024, 3, 31);

        store.save_median("roe", report_date, 0.1, &v1).unwrap();
        store.save_median("gross_margin", report_date, 0.2, &v1).unwrap();
        store.save_median("roe", report_date, 0.3, &v2).unwrap();

        assert_eq!(store.clear_cache(&v1).unwrap(), 2);
        assert!(store.get_cached_median("roe", report_date, &v1).unwrap().is_none());
        assert_eq!(store.get_cached_median("roe", report_date, &v2).unwrap(), Some(0.3));
        assert_eq!(store.median_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_statement_round_trip() {
        let store = InMemoryStore::new();
        let a = StockCode::new("A");
        let b = StockCode::new("B");

        assert!(!store.has_data().await.unwrap());

        let (added, skipped) = store
            .put_balance_sheets(&[
                BalanceSheetRow::new(a.clone(), date(2023, 12, 31)),
                BalanceSheetRow::new(a.clone(), date(2024, 3, 31)),
                BalanceSheetRow::new(b.clone(), date(2024, 3, 31)),
                BalanceSheetRow::new(a.clone(), date(2024, 3, 31)),
            ])
            .unwrap();
        assert_eq!((added, skipped), (3, 1));
        store
            .put_income_statements(&[IncomeStatementRow::new(a.clone(), date(2024, 3, 31))])
            .unwrap();

        assert!(store.has_data().await.unwrap());

        let company = store
            .query_company_periods(&a, date(2024, 1, 1), date(2024, 12, 31))
            .await
            .unwrap();
        assert_eq!(company.balance_sheets.len(), 1);
        assert_eq!(company.income_statements.len(), 1);
        assert!(company.cash_flows.is_empty());
        assert!(!company.is_complete());

        let market = store.query_market_statements(date(2024, 3, 31)).await.unwrap();
        assert_eq!(market.balance_sheets.len(), 2);
        assert_eq!(market.income_statements.len(), 1);
    }

    #[tokio::test]
    async fn test_company_name_lookup() {
        let store = InMemoryStore::new();
        let code = StockCode::new("SH600519");
        assert!(store.company_name(&code).await.unwrap().is_none());

        store.put_company_name(&code, "Kweichow Moutai").unwrap();
        assert_eq!(
            store.company_name(&code).await.unwrap().as_deref(),
            Some("Kweichow Moutai")
        );
    }
}
