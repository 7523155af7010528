//! Engine Module
//!
//! The merge engine that coordinates schema, input and storage.
//!
//! ## Responsibilities
//! - Validate the declared schema at construction
//! - Materialize the merge database lazily on the first merge
//! - Upsert every input record keyed by the index columns
//! - Track affected/total row counters across merges
//! - Scan the merged rows and release storage exactly once
//!
//! ## Lifecycle
//! ```text
//! Uninitialized ──merge()──▶ Active ──cleanup()──▶ Closed
//!       │                                            ▲
//!       └──────────────────cleanup()─────────────────┘
//! ```

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::{Config, DatabaseLocation};
use crate::error::{BlendError, Result};
use crate::input::{CsvSource, RecordSource};
use crate::normalize::normalize;
use crate::schema::Schema;
use crate::storage::{ensure_linked_version, MergeDatabase, ScannedRow};

/// Result of one successful merge call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Rows inserted or changed by this call (counted even for the first call)
    pub affected: u64,

    /// Rows in the merge table after this call
    pub rowcount: u64,

    /// Wall time spent ingesting the input
    pub elapsed: Duration,
}

/// Materialized storage: the connection plus what cleanup must delete
struct ActiveStorage {
    database: MergeDatabase,

    /// Database file to delete on cleanup (`None` for in-memory)
    file: Option<PathBuf>,

    /// Engine-created directory holding `file`, removed after it
    temp_dir: Option<TempDir>,
}

impl ActiveStorage {
    /// Close the connection and delete the backing files
    ///
    /// Every step runs even if an earlier one fails; the first error wins.
    fn release(self) -> Result<()> {
        let closed = self.database.close();

        let removed = match &self.file {
            Some(path) => {
                debug!(path = %path.display(), "Remove the merge database");
                fs::remove_file(path).map_err(BlendError::from)
            }
            None => Ok(()),
        };

        let dir_removed = match self.temp_dir {
            Some(dir) => dir.close().map_err(BlendError::from),
            None => Ok(()),
        };

        closed.and(removed).and(dir_removed)
    }
}

enum State {
    /// Schema validated, no storage yet
    Uninitialized,

    /// Storage exists; merges and scans permitted
    Active(ActiveStorage),

    /// Terminal
    Closed,
}

/// Incremental CSV merge engine
///
/// ## Ownership Model
///
/// The engine exclusively owns its SQLite connection. Merges take
/// `&mut self`, so one engine can never run two merges at once. Scans
/// borrow the engine shared and read pages lazily.
pub struct MergeEngine {
    config: Config,
    schema: Schema,
    state: State,

    /// Rows created or updated by merges after the first
    affected_count: u64,

    /// Distinct rows currently stored
    rowcount: u64,

    /// Successful merge calls
    merge_count: u64,
}

impl MergeEngine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const DATABASE_FILENAME: &'static str = "merge.db";
    const TEMP_DIR_PREFIX: &'static str = "csvblend-";

    /// Create an engine with the default config (temporary database)
    pub fn new<C, I, S, T>(columns: C, index: I) -> Result<Self>
    where
        C: IntoIterator<Item = S>,
        I: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self::with_config(columns, index, Config::default())
    }

    /// Create an engine with the given config
    ///
    /// Checks, in order:
    /// 1. The linked SQLite supports upsert
    /// 2. The schema is valid (see [`Schema::new`])
    ///
    /// No storage is touched until the first merge.
    pub fn with_config<C, I, S, T>(columns: C, index: I, config: Config) -> Result<Self>
    where
        C: IntoIterator<Item = S>,
        I: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        ensure_linked_version()?;
        let schema = Schema::new(columns, index)?;

        Ok(Self {
            config,
            schema,
            state: State::Uninitialized,
            affected_count: 0,
            rowcount: 0,
            merge_count: 0,
        })
    }

    /// Run `f` with a fresh engine and always clean it up afterwards
    ///
    /// An error from `f` is returned in preference to a cleanup error.
    pub fn scoped<C, I, S, T, F, R>(columns: C, index: I, config: Config, f: F) -> Result<R>
    where
        C: IntoIterator<Item = S>,
        I: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
        F: FnOnce(&mut MergeEngine) -> Result<R>,
    {
        let mut engine = Self::with_config(columns, index, config)?;
        let result = f(&mut engine);
        let cleaned = engine.cleanup();
        let value = result?;
        cleaned?;
        Ok(value)
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Merge one input into the dataset
    ///
    /// Steps:
    /// 1. Check the input header covers every declared column
    /// 2. Materialize storage on first use
    /// 3. Upsert all records in input order and commit
    /// 4. Update counters (the first merge is the baseline and is not
    ///    added to `affected_count`)
    pub fn merge<S: RecordSource>(&mut self, mut source: S) -> Result<MergeOutcome> {
        self.ensure_open()?;
        let start = Instant::now();

        let fields = source.field_names()?;
        let positions = self.project(&fields)?;

        let database = self.database_mut()?;
        let records = std::iter::from_fn(|| source.next_record()).map(|record| {
            let record = record?;
            positions
                .iter()
                .map(|&p| {
                    record.get(p).cloned().ok_or_else(|| {
                        BlendError::Input(format!(
                            "record has {} fields, expected at least {}",
                            record.len(),
                            p + 1
                        ))
                    })
                })
                .collect::<Result<Vec<String>>>()
        });

        let affected = database.upsert(records)? as u64;
        let rowcount = database.count()?;

        if self.merge_count != 0 {
            self.affected_count += affected;
        }
        self.merge_count += 1;
        self.rowcount = rowcount;

        let elapsed = start.elapsed();
        debug!(
            affected,
            rowcount,
            merge_count = self.merge_count,
            "Merged input in {:.05}s",
            elapsed.as_secs_f64()
        );

        Ok(MergeOutcome {
            affected,
            rowcount,
            elapsed,
        })
    }

    /// Merge CSV text read from `reader` (first row is the header)
    pub fn merge_reader<R: Read>(&mut self, reader: R) -> Result<MergeOutcome> {
        self.merge(CsvSource::from_reader(reader))
    }

    /// Merge a CSV file
    pub fn merge_path(&mut self, path: impl AsRef<Path>) -> Result<MergeOutcome> {
        self.ensure_open()?;
        let source = CsvSource::from_path(path)?;
        self.merge(source)
    }

    /// Map every declared column to its position in the input header
    ///
    /// Matching is done on normalized tokens. If a header repeats a name,
    /// the last occurrence is used.
    fn project(&self, fields: &[String]) -> Result<Vec<usize>> {
        let tokens: Vec<String> = fields.iter().map(|f| normalize(f)).collect();

        let mut positions = Vec::with_capacity(self.schema.columns().len());
        let mut missing = Vec::new();

        for (token, name) in self.schema.columns().iter() {
            match tokens.iter().rposition(|t| t == token) {
                Some(position) => positions.push(position),
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(BlendError::SchemaMismatch { missing });
        }
        Ok(positions)
    }

    // =========================================================================
    // Scan
    // =========================================================================

    /// Lazily iterate every stored row, values in declared column order
    ///
    /// Rows come back in first-insertion order. Each call starts a fresh
    /// scan of the current contents. Before the first merge the iterator
    /// is empty.
    pub fn rows(&self) -> Result<Rows<'_>> {
        match &self.state {
            State::Closed => Err(BlendError::Closed),
            State::Uninitialized => Ok(Rows::new(None, self.config.scan_batch_size)),
            State::Active(storage) => Ok(Rows::new(
                Some(&storage.database),
                self.config.scan_batch_size,
            )),
        }
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Release storage and close the engine
    ///
    /// Idempotent: calling it on a closed engine does nothing. The engine
    /// is closed afterwards even when deleting the database fails.
    pub fn cleanup(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Closed => Ok(()),
            State::Uninitialized => {
                debug!("Cleanup before any merge, nothing to release");
                Ok(())
            }
            State::Active(storage) => {
                debug!("Release the merge database");
                storage.release()
            }
        }
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Closed => Err(BlendError::Closed),
            _ => Ok(()),
        }
    }

    /// The open database, creating it on first use
    fn database_mut(&mut self) -> Result<&mut MergeDatabase> {
        if let State::Uninitialized = self.state {
            let storage = self.materialize()?;
            self.state = State::Active(storage);
        }

        match &mut self.state {
            State::Active(storage) => Ok(&mut storage.database),
            _ => Err(BlendError::Closed),
        }
    }

    fn materialize(&self) -> Result<ActiveStorage> {
        let (file, temp_dir) = match &self.config.location {
            DatabaseLocation::Temporary => {
                let dir = tempfile::Builder::new()
                    .prefix(Self::TEMP_DIR_PREFIX)
                    .tempdir()?;
                (Some(dir.path().join(Self::DATABASE_FILENAME)), Some(dir))
            }
            DatabaseLocation::Memory => (None, None),
            DatabaseLocation::File(path) => (Some(path.clone()), None),
        };

        match &file {
            Some(path) => info!(path = %path.display(), "Materializing merge database"),
            None => info!("Materializing in-memory merge database"),
        }

        let columns: Vec<&str> = self.schema.columns().tokens().collect();
        let index: Vec<&str> = self.schema.index().tokens().collect();
        let values: Vec<&str> = self.schema.values().tokens().collect();
        let database = MergeDatabase::open(
            file.as_deref(),
            self.config.durability,
            &columns,
            &index,
            &values,
        )?;

        Ok(ActiveStorage {
            database,
            file,
            temp_dir,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Rows created or updated by merges after the first
    pub fn affected_count(&self) -> u64 {
        self.affected_count
    }

    /// Distinct rows in storage after the last merge
    pub fn rowcount(&self) -> u64 {
        self.rowcount
    }

    /// Number of successful merges
    pub fn merge_count(&self) -> u64 {
        self.merge_count
    }

    /// True once `cleanup` has run
    pub fn closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Database file path once storage exists (`None` for in-memory)
    pub fn database_path(&self) -> Option<&Path> {
        match &self.state {
            State::Active(storage) => storage.file.as_deref(),
            _ => None,
        }
    }

    /// The open database, if storage has been materialized
    pub fn database(&self) -> Option<&MergeDatabase> {
        match &self.state {
            State::Active(storage) => Some(&storage.database),
            _ => None,
        }
    }
}

impl Drop for MergeEngine {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!(error = %e, "Cleanup on drop failed");
        }
    }
}

/// Lazy scan over the merge table, one page at a time
pub struct Rows<'a> {
    database: Option<&'a MergeDatabase>,
    page_size: usize,
    last_rowid: i64,
    page: std::vec::IntoIter<ScannedRow>,
    exhausted: bool,
}

impl<'a> Rows<'a> {
    fn new(database: Option<&'a MergeDatabase>, page_size: usize) -> Self {
        Self {
            exhausted: database.is_none(),
            database,
            page_size: page_size.max(1),
            last_rowid: i64::MIN,
            page: Vec::new().into_iter(),
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((rowid, values)) = self.page.next() {
                self.last_rowid = rowid;
                return Some(Ok(values));
            }
            if self.exhausted {
                return None;
            }

            let database = self.database?;
            match database.scan_page(self.last_rowid, self.page_size) {
                Ok(page) => {
                    if page.len() < self.page_size {
                        self.exhausted = true;
                    }
                    if page.is_empty() {
                        return None;
                    }
                    self.page = page.into_iter();
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
