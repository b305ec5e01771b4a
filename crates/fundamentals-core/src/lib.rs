#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for fundamental cross-sectional analysis.
//!
//! This crate provides the foundational abstractions shared by the store and
//! analysis crates:
//!
//! - [`StatementStore`](store::StatementStore) - Company and market statement queries
//! - [`MedianCache`](store::MedianCache) - Versioned persistent median cache
//! - [`Indicator`](indicator::Indicator) - The compared financial ratios
//! - [`ColumnMapping`](mapping::ColumnMapping) - Provider column normalisation
//! - [`AnalysisResult`](report::AnalysisResult) - Structured output for renderers

/// Error types for fundamentals operations.
pub mod error;
/// Indicator catalogue.
pub mod indicator;
/// Provider column mapping.
pub mod mapping;
/// Analysis result types.
pub mod report;
/// Store traits consumed by the analysis pipeline.
pub mod store;
/// Core data types (statement rows, periods, codes, versions).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{FundamentalsError, Result};
pub use indicator::Indicator;
pub use mapping::ColumnMapping;
pub use report::{
    AnalysisOutcome, AnalysisResult, CompanyInfo, ComparisonRow, Distribution,
    DistributionStatistics, IndicatorComparison, IndicatorUnavailable, NoAnalysisReason,
    SeriesPoint,
};
pub use store::{MedianCache, StatementStore};
pub use types::{
    BalanceSheetRow, CacheVersion, CashFlowRow, CompanyStatements, IncomeStatementRow,
    MarketStatements, PeriodRow, RawStatement, StatementKind, StatementRecord, StockCode,
};
