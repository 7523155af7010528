//! Storage Module
//!
//! The merge table lives in SQLite.
//!
//! ## Responsibilities
//! - Create the table from normalized column tokens
//! - Batch upsert (insert, else update only when values differ)
//! - Paged full scan in first-insertion order
//! - Row counting and connection teardown
//!
//! ## Table Layout
//! ```text
//! merge_table
//! ┌──────────────┬──────────────┬─────┬──────────────────────────┐
//! │ "<crc32(c1)>"│ "<crc32(c2)>"│ ... │ UNIQUE (<crc32(index)>)  │
//! │     TEXT     │     TEXT     │     │                          │
//! └──────────────┴──────────────┴─────┴──────────────────────────┘
//! ```

mod database;
pub mod sql;

pub use database::{
    ensure_linked_version, ensure_supported_version, MergeDatabase, ScannedRow, MERGE_TABLE,
    MIN_SQLITE_VERSION,
};
