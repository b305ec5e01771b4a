#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Store implementations for the fundamentals workspace.
//!
//! This crate provides implementations of the store traits from `fundamentals-core`:
//!
//! - [`SqliteStore`] - Persistent SQLite-backed store (default, requires `sqlite` feature)
//! - [`InMemoryStore`] - Simple in-memory store for testing
//! - [`NoopCache`] - Median cache that doesn't store anything

/// In-memory store implementation.
pub mod memory;
/// No-op median cache implementation.
pub mod noop;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the traits for convenience
pub use fundamentals_core::{MedianCache, StatementStore};

// Re-export implementations
pub use memory::InMemoryStore;
pub use noop::NoopCache;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
