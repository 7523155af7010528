//! Merge Schema
//!
//! Declared columns and the index (key) subset, validated once at
//! construction and kept in normalized form for the storage layer.

use std::collections::HashSet;

use crate::error::{BlendError, Result};
use crate::normalize::NormalizedColumns;

/// Validated merge schema
///
/// Invariants:
/// - columns and index are both non-empty
/// - index ⊆ columns
/// - neither contains duplicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Every declared column, declared order
    columns: NormalizedColumns,

    /// Key columns, declared order of the index argument
    index: NormalizedColumns,

    /// Non-key columns (columns - index), declared column order
    values: NormalizedColumns,
}

impl Schema {
    /// Validate `columns` and `index` and build the normalized mappings
    ///
    /// Checks run in a fixed order and the first failure is reported.
    pub fn new<C, I, S, T>(columns: C, index: I) -> Result<Self>
    where
        C: IntoIterator<Item = S>,
        I: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let index: Vec<String> = index.into_iter().map(Into::into).collect();

        if columns.is_empty() {
            return Err(BlendError::Config("columns is an empty sequence".into()));
        }
        if index.is_empty() {
            return Err(BlendError::Config("index is an empty sequence".into()));
        }

        let column_set: HashSet<&str> = columns.iter().map(String::as_str).collect();
        let index_set: HashSet<&str> = index.iter().map(String::as_str).collect();

        if !index_set.is_subset(&column_set) {
            return Err(BlendError::Config(
                "index must be a subset of columns".into(),
            ));
        }
        if column_set.len() < columns.len() {
            return Err(BlendError::Config(
                "columns contains duplicate items".into(),
            ));
        }
        if index_set.len() < index.len() {
            return Err(BlendError::Config("index contains duplicate items".into()));
        }

        let columns = NormalizedColumns::new(&columns);
        let index = NormalizedColumns::new(&index);
        let values = NormalizedColumns::new(
            columns
                .iter()
                .filter(|(token, _)| !index.contains(token))
                .map(|(_, name)| name),
        );

        Ok(Self {
            columns,
            index,
            values,
        })
    }

    pub fn columns(&self) -> &NormalizedColumns {
        &self.columns
    }

    pub fn index(&self) -> &NormalizedColumns {
        &self.index
    }

    /// Columns that are overwritten when a key already exists
    pub fn values(&self) -> &NormalizedColumns {
        &self.values
    }

    /// Declared column names, in declared order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.names().map(str::to_string).collect()
    }
}
