//! # csvblend
//!
//! Incrementally merge CSV inputs that share a schema into one
//! deduplicated dataset:
//! - A subset of the columns (the index) identifies a row
//! - Later inputs update earlier rows with the same key, otherwise append
//! - Counters track rows affected by merges and the total row count
//! - Column names are normalized so any header text is storage-safe
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   RecordSource (CSV / memory)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ header + records
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      MergeEngine                            │
//! │        (schema check, projection, counters, lifecycle)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ normalized tokens
//!                       ▼
//!               ┌───────────────┐
//!               │ MergeDatabase │
//!               │   (SQLite)    │
//!               └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use csvblend::{Config, MergeEngine};
//!
//! # fn main() -> csvblend::Result<()> {
//! let rows = MergeEngine::scoped(
//!     ["field1", "field2", "field3"],
//!     ["field1"],
//!     Config::default(),
//!     |engine| {
//!         engine.merge_path("csvfile1")?;
//!         engine.merge_path("csvfile2")?;
//!         engine.rows()?.collect::<csvblend::Result<Vec<_>>>()
//!     },
//! )?;
//! for row in rows {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod normalize;
pub mod schema;
pub mod input;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BlendError, Result};
pub use config::{Config, DatabaseLocation, Durability};
pub use engine::{MergeEngine, MergeOutcome, Rows};
pub use input::{CsvSource, MemorySource, RecordSource};
pub use normalize::{normalize, NormalizedColumns};
pub use schema::Schema;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of csvblend
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
