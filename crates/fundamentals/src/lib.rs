#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Company-vs-market fundamental analysis.
//!
//! This crate re-exports the core types, the store implementations and the
//! analysis pipeline, and provides the [`Orchestrator`] that sequences them
//! for one company, together with TOML configuration and a renderer seam.
//!
//! # Features
//!
//! - `sqlite` - SQLite-backed statement store and median cache

// Core types and traits
pub use fundamentals_core::*;

// Store implementations
#[cfg(feature = "sqlite")]
pub use fundamentals_cache::SqliteStore;
pub use fundamentals_cache::{InMemoryStore, NoopCache};

// Analysis pipeline
pub use fundamentals_analysis::{
    DEFAULT_HISTOGRAM_BINS, MarketAggregator, assemble_periods, calculator,
    compare_company_to_market, compute_indicators, market_sample, query_market_sample,
};

mod config;
mod orchestrator;
mod render;

pub use config::{AnalysisConfig, AnalysisSettings, DatabaseConfig};
pub use orchestrator::Orchestrator;
pub use render::{AnalysisRenderer, JsonRenderer};
