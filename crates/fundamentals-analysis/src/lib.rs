#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cross-sectional analytics over financial-statement data.
//!
//! The pipeline runs leaf-first:
//!
//! 1. [`assemble_periods`] joins a company's statements into [`PeriodRow`](fundamentals_core::PeriodRow)s
//!    and reconstructs TTM revenue
//! 2. [`compute_indicators`] evaluates the ratio calculator per period
//! 3. [`query_market_sample`] derives each date's market sample
//! 4. [`compare_company_to_market`] drives a [`MarketAggregator`] across the
//!    company's history

/// Cached market medians, percentiles and distributions.
pub mod aggregator;
/// Period assembly and TTM revenue.
pub mod assembler;
/// Pure financial ratio functions.
pub mod calculator;
/// Company-vs-market comparison.
pub mod comparator;
/// Company indicator values per period.
pub mod indicators;
/// Market sample derivation.
pub mod market;
/// Sample statistics.
pub mod statistics;

pub use aggregator::{DEFAULT_HISTOGRAM_BINS, MarketAggregator};
pub use assembler::assemble_periods;
pub use comparator::compare_company_to_market;
pub use indicators::{company_series, compute_indicators, indicator_value};
pub use market::{market_sample, query_market_sample};
