//! Analysis result types handed to renderers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::indicator::Indicator;
use crate::types::{CacheVersion, StockCode};

/// One value of a company's indicator time series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Period end date.
    pub report_date: NaiveDate,
    /// Indicator value.
    pub value: f64,
}

/// A company's value against the market for one indicator and period.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Period end date.
    pub report_date: NaiveDate,
    /// The company's indicator value.
    pub company_value: f64,
    /// Market median for the period, if computable.
    pub market_median: Option<f64>,
    /// Share of the market at or below the company value, in `[0, 1]`.
    pub percentile: Option<f64>,
}

/// Descriptive statistics of a market sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionStatistics {
    /// Arithmetic mean.
    pub mean: f64,
    /// Median.
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Minimum.
    pub min: f64,
    /// Maximum.
    pub max: f64,
    /// 25th percentile, linearly interpolated between order statistics.
    pub q25: f64,
    /// 75th percentile, linearly interpolated between order statistics.
    pub q75: f64,
    /// Number of valid observations.
    pub count: usize,
}

/// Histogram and summary of a market sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Observation count per bin.
    pub histogram: Vec<usize>,
    /// Bin edges, one more than the number of bins.
    pub bin_edges: Vec<f64>,
    /// Summary statistics.
    pub statistics: DistributionStatistics,
}

/// Market comparison for one indicator across a company's history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorComparison {
    /// Rows in ascending report-date order.
    pub rows: Vec<ComparisonRow>,
    /// Market distribution at the company's latest period for this indicator.
    pub latest_distribution: Option<Distribution>,
}

/// Identity of the analysed company.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Entity code.
    pub stock_code: StockCode,
    /// Display name; the code itself when the store has no name.
    pub stock_name: String,
    /// Date the analysis was run for.
    pub analysis_date: NaiveDate,
    /// Number of years of history requested.
    pub data_years: u32,
}

/// Complete result of one company analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Company identity.
    pub company: CompanyInfo,
    /// Median-cache version used for the run.
    pub cache_version: CacheVersion,
    /// Company time series per indicator (periods with a value only).
    pub indicators: BTreeMap<Indicator, Vec<SeriesPoint>>,
    /// Market comparison per indicator (indicators with at least one row only).
    pub market_comparison: BTreeMap<Indicator, IndicatorComparison>,
    /// Indicators that could not be compared, with the reason. Every indicator
    /// appears either here or in `market_comparison`.
    #[serde(default)]
    pub unavailable: BTreeMap<Indicator, IndicatorUnavailable>,
}

/// Why one indicator has no market comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorUnavailable {
    /// The company has no value for this indicator in any period.
    NoCompanyValues,
    /// The company has values, but no period has a usable market sample.
    NoMarketData,
}

impl fmt::Display for IndicatorUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoCompanyValues => "company has no value in any period",
            Self::NoMarketData => "no period has usable market data",
        };
        f.write_str(text)
    }
}

/// Why an analysis could not produce anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoAnalysisReason {
    /// The statement store holds no data at all.
    EmptyStore,
    /// The company is missing at least one statement type in the window.
    CompanyNotFound,
    /// Statements exist but no indicator could be compared for any period.
    NoUsablePeriods,
}

impl fmt::Display for NoAnalysisReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::EmptyStore => "statement store is empty",
            Self::CompanyNotFound => "company has no complete statement history",
            Self::NoUsablePeriods => "no indicator could be compared for any period",
        };
        f.write_str(text)
    }
}

/// Outcome of a company analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// The analysis ran and produced a result.
    Completed(Box<AnalysisResult>),
    /// The analysis could not run.
    NoAnalysisPossible {
        /// Entity that was requested.
        stock_code: StockCode,
        /// What was missing.
        reason: NoAnalysisReason,
    },
}

impl AnalysisOutcome {
    /// Returns the result if the analysis completed.
    #[must_use]
    pub fn into_result(self) -> Option<AnalysisResult> {
        match self {
            Self::Completed(result) => Some(*result),
            Self::NoAnalysisPossible { .. } => None,
        }
    }
}
