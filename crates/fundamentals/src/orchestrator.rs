//! Orchestrator sequencing assembly, ratio calculation and market comparison.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Months, NaiveDate};
use futures::future::try_join_all;
use tracing::{debug, info, instrument, warn};

use fundamentals_analysis::{
    MarketAggregator, assemble_periods, compare_company_to_market, compute_indicators,
    market_sample,
};
use fundamentals_core::{
    AnalysisOutcome, AnalysisResult, CacheVersion, CompanyInfo, Indicator, IndicatorComparison,
    IndicatorUnavailable, MarketStatements, MedianCache, NoAnalysisReason, Result, SeriesPoint,
    StatementStore, StockCode,
};

use crate::config::AnalysisConfig;

/// Runs company-vs-market analyses for one session.
///
/// The orchestrator owns a single [`MarketAggregator`], so medians computed
/// for one company are reused for every later company analysed with the same
/// orchestrator. Each session gets its own cache version.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use fundamentals::{AnalysisConfig, InMemoryStore, Orchestrator, StockCode};
///
/// let store = Arc::new(InMemoryStore::new());
/// let orchestrator = Orchestrator::new(store.clone(), store, AnalysisConfig::default());
/// let outcome = orchestrator
///     .analyze_company(&StockCode::new("SH600519"), as_of)
///     .await?;
/// ```
pub struct Orchestrator {
    statements: Arc<dyn StatementStore>,
    aggregator: MarketAggregator,
    config: AnalysisConfig,
    cache_version: CacheVersion,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("aggregator", &self.aggregator)
            .field("config", &self.config)
            .field("cache_version", &self.cache_version)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator over a statement store and a median cache.
    ///
    /// The cache version comes from the configuration, or is the current
    /// timestamp when none is configured.
    #[must_use]
    pub fn new(
        statements: Arc<dyn StatementStore>,
        medians: Arc<dyn MedianCache>,
        config: AnalysisConfig,
    ) -> Self {
        let cache_version = config.cache_version();
        debug!(cache_version = %cache_version, "Creating orchestrator");
        Self {
            statements,
            aggregator: MarketAggregator::new(medians),
            config,
            cache_version,
        }
    }

    /// Overrides the session's cache version.
    #[must_use]
    pub fn with_cache_version(mut self, version: CacheVersion) -> Self {
        self.cache_version = version;
        self
    }

    /// Cache version used by this session.
    #[must_use]
    pub const fn cache_version(&self) -> &CacheVersion {
        &self.cache_version
    }

    /// Configuration of this session.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The session's aggregator.
    #[must_use]
    pub const fn aggregator(&self) -> &MarketAggregator {
        &self.aggregator
    }

    /// Analyses one company against the market.
    ///
    /// Loads `config.analysis.years` of history ending at `as_of`. Returns
    /// [`AnalysisOutcome::NoAnalysisPossible`] when the store is empty, the
    /// company lacks a statement type in the window, or no indicator could be
    /// compared for any period.
    ///
    /// # Errors
    /// Returns an error if a store query or the median cache fails.
    #[instrument(skip(self), fields(stock_code = %stock_code, version = %self.cache_version))]
    pub async fn analyze_company(
        &self,
        stock_code: &StockCode,
        as_of: NaiveDate,
    ) -> Result<AnalysisOutcome> {
        info!("Starting analysis");

        if !self.statements.has_data().await? {
            warn!("Statement store is empty, import data first");
            return Ok(no_analysis(stock_code, NoAnalysisReason::EmptyStore));
        }

        let years = self.config.analysis.years;
        let start = as_of
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN);
        let company = self
            .statements
            .query_company_periods(stock_code, start, as_of)
            .await?;
        if !company.is_complete() {
            warn!("No complete statement history found");
            return Ok(no_analysis(stock_code, NoAnalysisReason::CompanyNotFound));
        }

        let periods = assemble_periods(&company);
        let indicators = compute_indicators(&periods);

        let market = self.load_market(&indicators).await?;
        let (market_comparison, unavailable) = self.compare_with_market(&indicators, &market)?;
        if market_comparison.is_empty() {
            warn!("No indicator could be compared with the market");
            return Ok(no_analysis(stock_code, NoAnalysisReason::NoUsablePeriods));
        }

        let stock_name = match self.statements.company_name(stock_code).await {
            Ok(Some(name)) => name,
            Ok(None) => stock_code.to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to look up company name");
                stock_code.to_string()
            }
        };

        info!(
            indicators = market_comparison.len(),
            unavailable = unavailable.len(),
            periods = periods.len(),
            "Analysis complete"
        );

        Ok(AnalysisOutcome::Completed(Box::new(AnalysisResult {
            company: CompanyInfo {
                stock_code: stock_code.clone(),
                stock_name,
                analysis_date: as_of,
                data_years: years,
            },
            cache_version: self.cache_version.clone(),
            indicators,
            market_comparison,
            unavailable,
        })))
    }

    /// Loads the market cross-section for every date on which the company has
    /// at least one indicator value, concurrently.
    async fn load_market(
        &self,
        indicators: &BTreeMap<Indicator, Vec<SeriesPoint>>,
    ) -> Result<BTreeMap<NaiveDate, MarketStatements>> {
        let dates: BTreeSet<NaiveDate> = indicators
            .values()
            .flatten()
            .map(|point| point.report_date)
            .collect();

        debug!(dates = dates.len(), "Loading market statements");
        let statements = try_join_all(
            dates
                .iter()
                .map(|date| self.statements.query_market_statements(*date)),
        )
        .await?;

        Ok(dates.into_iter().zip(statements).collect())
    }

    /// Compares every indicator with the market. Indicators without a single
    /// comparison row are reported in the second map with the reason.
    fn compare_with_market(
        &self,
        indicators: &BTreeMap<Indicator, Vec<SeriesPoint>>,
        market: &BTreeMap<NaiveDate, MarketStatements>,
    ) -> Result<(
        BTreeMap<Indicator, IndicatorComparison>,
        BTreeMap<Indicator, IndicatorUnavailable>,
    )> {
        let mut comparisons = BTreeMap::new();
        let mut unavailable = BTreeMap::new();

        for (&indicator, series) in indicators {
            let Some(latest) = series.last() else {
                debug!(indicator = %indicator, "No company values");
                unavailable.insert(indicator, IndicatorUnavailable::NoCompanyValues);
                continue;
            };

            let company: BTreeMap<NaiveDate, f64> = series
                .iter()
                .map(|point| (point.report_date, point.value))
                .collect();
            let samples: BTreeMap<NaiveDate, Vec<Option<f64>>> = company
                .keys()
                .filter_map(|date| {
                    market
                        .get(date)
                        .filter(|statements| !statements.is_empty())
                        .map(|statements| (*date, market_sample(indicator, statements)))
                })
                .collect();

            let rows = compare_company_to_market(
                &self.aggregator,
                indicator,
                &company,
                &samples,
                &self.cache_version,
            )?;
            if rows.is_empty() {
                debug!(indicator = %indicator, "No market data for any period");
                unavailable.insert(indicator, IndicatorUnavailable::NoMarketData);
                continue;
            }

            let latest_distribution = samples.get(&latest.report_date).and_then(|sample| {
                self.aggregator
                    .compute_distribution(sample, self.config.analysis.histogram_bins)
            });

            comparisons.insert(
                indicator,
                IndicatorComparison {
                    rows,
                    latest_distribution,
                },
            );
        }

        Ok((comparisons, unavailable))
    }

    /// Purges the session's cache version from both median tiers.
    ///
    /// Returns the number of persistent entries removed.
    ///
    /// # Errors
    /// Returns an error if the median cache fails.
    pub fn clear_cache(&self) -> Result<usize> {
        let removed = self.aggregator.clear_cache(&self.cache_version)?;
        info!(version = %self.cache_version, removed, "Cleared median cache");
        Ok(removed)
    }
}

fn no_analysis(stock_code: &StockCode, reason: NoAnalysisReason) -> AnalysisOutcome {
    AnalysisOutcome::NoAnalysisPossible {
        stock_code: stock_code.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fundamentals_cache::InMemoryStore;
    use fundamentals_core::{BalanceSheetRow, CashFlowRow, IncomeStatementRow};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const DATES: [(i32, u32, u32); 5] = [
        (2023, 3, 31),
        (2023, 6, 30),
        (2023, 9, 30),
        (2023, 12, 31),
        (2024, 3, 31),
    ];

    /// Seeds one entity with a constant gross margin at every period.
    fn seed(store: &InMemoryStore, code: &str, margin: f64) {
        let code = StockCode::new(code);
        for (i, &(y, m, d)) in DATES.iter().enumerate() {
            let report_date = date(y, m, d);
            let quarter = (i % 4 + 1) as f64;
            let revenue = if y == 2024 { 100.0 } else { 100.0 * quarter };

            store
                .put_balance_sheets(&[BalanceSheetRow {
                    total_assets: Some(1000.0),
                    total_equity: Some(500.0),
                    accounts_receivable: Some(50.0),
                    fixed_assets: Some(200.0),
                    ..BalanceSheetRow::new(code.clone(), report_date)
                }])
                .unwrap();
            store
                .put_income_statements(&[IncomeStatementRow {
                    total_operating_revenue: Some(revenue),
                    total_operating_cost: Some(revenue * (1.0 - margin)),
                    net_profit: Some(revenue * margin / 2.0),
                    ..IncomeStatementRow::new(code.clone(), report_date)
                }])
                .unwrap();
            store
                .put_cash_flows(&[CashFlowRow {
                    net_operating_cash_flow: Some(50.0),
                    ..CashFlowRow::new(code.clone(), report_date)
                }])
                .unwrap();
        }
    }

    fn orchestrator(store: &Arc<InMemoryStore>) -> Orchestrator {
        Orchestrator::new(store.clone(), store.clone(), AnalysisConfig::default())
            .with_cache_version(CacheVersion::new("test"))
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = Arc::new(InMemoryStore::new());
        let outcome = orchestrator(&store)
            .analyze_company(&StockCode::new("A"), date(2024, 6, 30))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AnalysisOutcome::NoAnalysisPossible {
                stock_code: StockCode::new("A"),
                reason: NoAnalysisReason::EmptyStore,
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_company() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "A", 0.3);

        let outcome = orchestrator(&store)
            .analyze_company(&StockCode::new("ZZZ"), date(2024, 6, 30))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            AnalysisOutcome::NoAnalysisPossible {
                reason: NoAnalysisReason::CompanyNotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_company_without_usable_periods() {
        let store = Arc::new(InMemoryStore::new());
        let code = StockCode::new("EMPTY");
        let report_date = date(2024, 3, 31);
        store
            .put_balance_sheets(&[BalanceSheetRow::new(code.clone(), report_date)])
            .unwrap();
        store
            .put_income_statements(&[IncomeStatementRow::new(code.clone(), report_date)])
            .unwrap();
        store
            .put_cash_flows(&[CashFlowRow::new(code.clone(), report_date)])
            .unwrap();

        let outcome = orchestrator(&store)
            .analyze_company(&code, date(2024, 6, 30))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            AnalysisOutcome::NoAnalysisPossible {
                reason: NoAnalysisReason::NoUsablePeriods,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_analysis_against_market() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "TARGET", 0.3);
        for (code, margin) in [("P1", 0.1), ("P2", 0.2), ("P3", 0.4), ("P4", 0.5)] {
            seed(&store, code, margin);
        }
        store
            .put_company_name(&StockCode::new("TARGET"), "Target Corp")
            .unwrap();

        let orchestrator = orchestrator(&store);
        let result = orchestrator
            .analyze_company(&StockCode::new("target"), date(2024, 6, 30))
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(result.company.stock_name, "Target Corp");
        assert_eq!(result.company.data_years, 10);
        assert_eq!(result.cache_version, CacheVersion::new("test"));

        let margin = &result.market_comparison[&Indicator::GrossMargin];
        assert_eq!(margin.rows.len(), DATES.len());
        for row in &margin.rows {
            assert_relative_eq!(row.company_value, 0.3, epsilon = 1e-12);
            assert_relative_eq!(row.market_median.unwrap(), 0.3, epsilon = 1e-12);
            assert_relative_eq!(row.percentile.unwrap(), 0.6);
        }

        let distribution = margin.latest_distribution.as_ref().unwrap();
        assert_eq!(distribution.histogram.len(), 20);
        assert_eq!(distribution.statistics.count, 5);

        // Turnovers need four quarters of TTM revenue and a begin period
        assert_eq!(result.market_comparison[&Indicator::ArTurnover].rows.len(), 2);
        assert_eq!(result.indicators[&Indicator::Roe].len(), 4);
        assert!(result.unavailable.is_empty());

        let medians = store.median_count().unwrap();
        assert!(medians > 0);

        // A second company in the same session reuses cached medians
        orchestrator
            .analyze_company(&StockCode::new("P1"), date(2024, 6, 30))
            .await
            .unwrap();
        assert_eq!(store.median_count().unwrap(), medians);

        assert_eq!(orchestrator.clear_cache().unwrap(), medians);
        assert_eq!(orchestrator.aggregator().memoized_count(), 0);
    }

    #[tokio::test]
    async fn test_indicators_without_ttm_history_are_reported() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "TARGET", 0.3);
        for (code, margin) in [("P1", 0.1), ("P2", 0.2)] {
            seed(&store, code, margin);
        }

        // Three quarters of history never reach four quarters of TTM revenue
        let result = orchestrator(&store)
            .analyze_company(&StockCode::new("TARGET"), date(2023, 9, 30))
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert!(result.indicators[&Indicator::ArTurnover].is_empty());
        assert_eq!(
            result.unavailable,
            BTreeMap::from([
                (Indicator::ArTurnover, IndicatorUnavailable::NoCompanyValues),
                (Indicator::LtAssetTurnover, IndicatorUnavailable::NoCompanyValues),
            ])
        );
        assert!(!result.market_comparison.contains_key(&Indicator::ArTurnover));
        assert_eq!(result.market_comparison[&Indicator::GrossMargin].rows.len(), 3);

        for indicator in Indicator::ALL {
            assert!(
                result.market_comparison.contains_key(&indicator)
                    != result.unavailable.contains_key(&indicator)
            );
        }
    }
}
