//! Merge Database
//!
//! SQLite connection owning the single merge table.

use std::path::Path;

use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use tracing::debug;

use crate::config::Durability;
use crate::error::{BlendError, Result};

use super::sql;

/// Name of the one table the merge database holds
pub const MERGE_TABLE: &str = "merge_table";

/// Oldest SQLite release with `INSERT ... ON CONFLICT DO UPDATE` (3.24.0)
pub const MIN_SQLITE_VERSION: i32 = 3_024_000;

/// Fail unless `version_number` (SQLite's `MMMmmmppp` encoding) supports upsert
pub fn ensure_supported_version(version_number: i32) -> Result<()> {
    if version_number < MIN_SQLITE_VERSION {
        return Err(BlendError::Precondition {
            found: format!(
                "{}.{}.{}",
                version_number / 1_000_000,
                (version_number / 1_000) % 1_000,
                version_number % 1_000
            ),
        });
    }
    Ok(())
}

/// Check the SQLite library this crate is linked against
pub fn ensure_linked_version() -> Result<()> {
    ensure_supported_version(rusqlite::version_number())
}

/// A row as returned by a scan page: (rowid, values in column order)
pub type ScannedRow = (i64, Vec<String>);

/// Connection plus the prepared SQL for the merge table
///
/// Column, index and value slices are normalized tokens; the value columns
/// are the columns outside the index. Records bound to the upsert statement
/// must follow the column order given to `open`.
pub struct MergeDatabase {
    conn: Connection,
    column_count: usize,
    upsert_sql: String,
    select_sql: String,
    count_sql: String,
}

impl MergeDatabase {
    /// Open a database (`None` = in-memory), tune durability, create the table
    pub fn open(
        path: Option<&Path>,
        durability: Durability,
        columns: &[&str],
        index: &[&str],
        values: &[&str],
    ) -> Result<Self> {
        let conn = match path {
            Some(path) => {
                debug!(path = %path.display(), "Create the merge database");
                Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
                )?
            }
            None => {
                debug!("Create the in-memory merge database");
                Connection::open_in_memory()?
            }
        };

        Self::configure_connection(&conn, durability)?;

        debug!(table = MERGE_TABLE, columns = columns.len(), "Create the merge table");
        conn.execute(&sql::create_table(MERGE_TABLE, columns, index), [])?;

        Ok(Self {
            conn,
            column_count: columns.len(),
            upsert_sql: sql::upsert(MERGE_TABLE, columns, index, values),
            select_sql: sql::select_page(MERGE_TABLE, columns),
            count_sql: sql::count(MERGE_TABLE),
        })
    }

    fn configure_connection(conn: &Connection, durability: Durability) -> Result<()> {
        let journal_mode: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            durability.journal_mode(),
            |row| row.get(0),
        )?;
        conn.pragma_update(None, "synchronous", durability.synchronous())?;
        debug!(journal_mode = %journal_mode, synchronous = durability.synchronous(), "Configured merge database");
        Ok(())
    }

    /// Upsert every record in order and commit
    ///
    /// Returns the number of rows inserted or changed. An error from the
    /// record iterator or from SQLite aborts the batch before commit.
    pub fn upsert<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Vec<String>>>,
    {
        let tx = self.conn.transaction()?;
        let mut affected = 0;
        {
            let mut stmt = tx.prepare_cached(&self.upsert_sql)?;
            for record in records {
                let record = record?;
                debug_assert_eq!(record.len(), self.column_count);
                affected += stmt.execute(params_from_iter(record.iter()))?;
            }
        }
        tx.commit()?;
        Ok(affected)
    }

    /// Up to `limit` rows with a rowid greater than `after_rowid`, in rowid order
    pub fn scan_page(&self, after_rowid: i64, limit: usize) -> Result<Vec<ScannedRow>> {
        let column_count = self.column_count;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare_cached(&self.select_sql)?;
        let rows = stmt.query_map(params![after_rowid, limit], |row| {
            let rowid: i64 = row.get(0)?;
            let mut values = Vec::with_capacity(column_count);
            for i in 1..=column_count {
                values.push(row.get::<_, String>(i)?);
            }
            Ok((rowid, values))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of rows in the merge table
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(&self.count_sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Close the connection, reporting any error SQLite raises on close
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| BlendError::Storage(e))
    }

    /// Borrow the raw connection (for inspection in tests and tooling)
    #[doc(hidden)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
