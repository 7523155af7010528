//! Configuration for csvblend
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

/// Path string SQLite reserves for a private in-memory database
pub const MEMORY_PATH: &str = ":memory:";

/// Main configuration for a merge engine
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Where the merge database lives
    pub location: DatabaseLocation,

    /// Durability of the merge database (journal + sync pragmas)
    pub durability: Durability,

    // -------------------------------------------------------------------------
    // Scan Configuration
    // -------------------------------------------------------------------------
    /// Rows fetched per page by `MergeEngine::rows`
    pub scan_batch_size: usize,
}

/// Backing location of the merge database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// A fresh temporary directory created on first merge, removed on cleanup
    Temporary,

    /// SQLite in-memory database (nothing to delete on cleanup)
    Memory,

    /// A caller-chosen database file, deleted on cleanup
    File(PathBuf),
}

impl DatabaseLocation {
    /// True for the in-memory location
    pub fn is_memory(&self) -> bool {
        matches!(self, DatabaseLocation::Memory)
    }
}

impl From<&str> for DatabaseLocation {
    fn from(path: &str) -> Self {
        if path == MEMORY_PATH {
            DatabaseLocation::Memory
        } else {
            DatabaseLocation::File(PathBuf::from(path))
        }
    }
}

impl From<String> for DatabaseLocation {
    fn from(path: String) -> Self {
        DatabaseLocation::from(path.as_str())
    }
}

impl From<&Path> for DatabaseLocation {
    fn from(path: &Path) -> Self {
        match path.to_str() {
            Some(s) => DatabaseLocation::from(s),
            None => DatabaseLocation::File(path.to_path_buf()),
        }
    }
}

impl From<PathBuf> for DatabaseLocation {
    fn from(path: PathBuf) -> Self {
        DatabaseLocation::from(path.as_path())
    }
}

/// Durability strategy for the merge database
///
/// Merged data can always be rebuilt from the source files, so the default
/// trades crash safety for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    /// Rollback journal kept in memory, no fsync (fastest)
    #[default]
    Off,

    /// Rollback journal, fsync at critical moments
    Normal,

    /// Rollback journal, fsync on every commit (safest, slowest)
    Full,
}

impl Durability {
    /// Value for `PRAGMA journal_mode`
    pub fn journal_mode(&self) -> &'static str {
        match self {
            Durability::Off => "MEMORY",
            Durability::Normal | Durability::Full => "DELETE",
        }
    }

    /// Value for `PRAGMA synchronous`
    pub fn synchronous(&self) -> &'static str {
        match self {
            Durability::Off => "OFF",
            Durability::Normal => "NORMAL",
            Durability::Full => "FULL",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: DatabaseLocation::Temporary,
            durability: Durability::Off,
            scan_batch_size: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the database location (`":memory:"` selects the in-memory database)
    pub fn location(mut self, location: impl Into<DatabaseLocation>) -> Self {
        self.config.location = location.into();
        self
    }

    /// Set the durability strategy
    pub fn durability(mut self, durability: Durability) -> Self {
        self.config.durability = durability;
        self
    }

    /// Set the number of rows fetched per scan page (minimum 1)
    pub fn scan_batch_size(mut self, size: usize) -> Self {
        self.config.scan_batch_size = size.max(1);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
