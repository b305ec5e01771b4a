//! Company-vs-market comparison.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use fundamentals_core::{CacheVersion, ComparisonRow, Indicator, Result};
use tracing::{debug, instrument};

use crate::aggregator::MarketAggregator;
use crate::statistics::valid_values;

/// Compares a company's indicator series with the market at each report date.
///
/// Dates without a market sample, or whose sample holds no valid value, are
/// skipped. Medians go through the aggregator's cache; percentiles are always
/// computed fresh. Rows come out in ascending report-date order.
///
/// # Errors
/// Returns an error only if the median cache fails.
#[instrument(skip_all, fields(indicator = %indicator, version = %version))]
pub fn compare_company_to_market(
    aggregator: &MarketAggregator,
    indicator: Indicator,
    company_series: &BTreeMap<NaiveDate, f64>,
    market_samples: &BTreeMap<NaiveDate, Vec<Option<f64>>>,
    version: &CacheVersion,
) -> Result<Vec<ComparisonRow>> {
    let mut rows = Vec::with_capacity(company_series.len());

    for (&report_date, &company_value) in company_series {
        let Some(sample) = market_samples.get(&report_date) else {
            debug!(%report_date, "No market sample, skipping");
            continue;
        };
        if valid_values(sample).is_empty() {
            debug!(%report_date, "Market sample has no valid values, skipping");
            continue;
        }

        let market_median =
            aggregator.compute_median(indicator.name(), report_date, sample, version)?;
        let percentile = aggregator.compute_percentile(company_value, sample);

        rows.push(ComparisonRow {
            report_date,
            company_value,
            market_median,
            percentile,
        });
    }

    debug!(rows = rows.len(), "Compared company to market");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fundamentals_cache::{InMemoryStore, MedianCache};
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_compare_company_to_market() {
        let store = Arc::new(InMemoryStore::new());
        let aggregator = MarketAggregator::new(store.clone());
        let version = CacheVersion::new("v1");

        let company = BTreeMap::from([
            (date(2024, 6, 30), 0.35),
            (date(2023, 12, 31), 0.30),
            (date(2024, 3, 31), 0.10),
            (date(2024, 9, 30), 0.50),
        ]);
        let market = BTreeMap::from([
            (
                date(2023, 12, 31),
                vec![Some(0.10), Some(0.20), Some(0.30), Some(0.40), Some(0.50)],
            ),
            (date(2024, 3, 31), vec![None, Some(f64::NAN)]),
            (date(2024, 6, 30), vec![Some(0.2), None, Some(0.4)]),
        ]);

        let rows =
            compare_company_to_market(&aggregator, Indicator::GrossMargin, &company, &market, &version)
                .unwrap();

        let dates: Vec<_> = rows.iter().map(|r| r.report_date).collect();
        assert_eq!(dates, vec![date(2023, 12, 31), date(2024, 6, 30)]);

        assert_relative_eq!(rows[0].company_value, 0.30);
        assert_relative_eq!(rows[0].market_median.unwrap(), 0.30);
        assert_relative_eq!(rows[0].percentile.unwrap(), 0.6);

        assert_relative_eq!(rows[1].market_median.unwrap(), 0.3);
        assert_relative_eq!(rows[1].percentile.unwrap(), 0.5);

        assert_eq!(store.median_save_calls(), 2);
        assert_eq!(
            store
                .get_cached_median("gross_margin", date(2023, 12, 31), &version)
                .unwrap(),
            Some(0.30)
        );
    }

    #[test]
    fn test_repeated_comparison_reuses_medians() {
        let store = Arc::new(InMemoryStore::new());
        let aggregator = MarketAggregator::new(store.clone());
        let version = CacheVersion::new("v1");

        let company = BTreeMap::from([(date(2024, 3, 31), 1.0)]);
        let market = BTreeMap::from([(date(2024, 3, 31), vec![Some(0.5), Some(1.5)])]);

        let first =
            compare_company_to_market(&aggregator, Indicator::Roe, &company, &market, &version)
                .unwrap();
        let second =
            compare_company_to_market(&aggregator, Indicator::Roe, &company, &market, &version)
                .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.median_save_calls(), 1);
    }

    #[test]
    fn test_no_market_data_yields_no_rows() {
        let aggregator = MarketAggregator::new(Arc::new(InMemoryStore::new()));
        let company = BTreeMap::from([(date(2024, 3, 31), 1.0)]);

        let rows = compare_company_to_market(
            &aggregator,
            Indicator::Roe,
            &company,
            &BTreeMap::new(),
            &CacheVersion::new("v1"),
        )
        .unwrap();
        assert!(rows.is_empty());
    }
}
