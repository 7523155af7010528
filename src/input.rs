//! Record Sources
//!
//! The merge engine does not parse CSV itself. It reads field names once,
//! then pulls records whose values line up with those names.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{BlendError, Result};

/// A header followed by a sequence of records
pub trait RecordSource {
    /// Field names, read once before any record
    fn field_names(&mut self) -> Result<Vec<String>>;

    /// Next record, values aligned with `field_names`; `None` at the end
    fn next_record(&mut self) -> Option<Result<Vec<String>>>;
}

impl<T: RecordSource + ?Sized> RecordSource for &mut T {
    fn field_names(&mut self) -> Result<Vec<String>> {
        (**self).field_names()
    }

    fn next_record(&mut self) -> Option<Result<Vec<String>>> {
        (**self).next_record()
    }
}

// =============================================================================
// CSV Source
// =============================================================================

/// Records read from CSV text whose first row is the header
pub struct CsvSource<R> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        Self {
            reader,
            record: csv::StringRecord::new(),
        }
    }
}

impl CsvSource<File> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> RecordSource for CsvSource<R> {
    fn field_names(&mut self) -> Result<Vec<String>> {
        let headers = self.reader.headers()?;
        Ok(headers.iter().map(str::to_string).collect())
    }

    fn next_record(&mut self) -> Option<Result<Vec<String>>> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(Ok(self.record.iter().map(str::to_string).collect())),
            Ok(false) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

// =============================================================================
// In-Memory Source
// =============================================================================

/// Records held in memory, mostly for tests and programmatic callers
#[derive(Debug, Clone)]
pub struct MemorySource {
    fields: Vec<String>,
    records: std::vec::IntoIter<Vec<String>>,
    position: usize,
}

impl MemorySource {
    pub fn new<F, S, R, V>(fields: F, records: R) -> Self
    where
        F: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = V>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let fields = fields.into_iter().map(Into::into).collect();
        let records: Vec<Vec<String>> = records
            .into_iter()
            .map(|record| record.into_iter().map(Into::into).collect())
            .collect();
        Self {
            fields,
            records: records.into_iter(),
            position: 0,
        }
    }
}

impl RecordSource for MemorySource {
    fn field_names(&mut self) -> Result<Vec<String>> {
        Ok(self.fields.clone())
    }

    fn next_record(&mut self) -> Option<Result<Vec<String>>> {
        let record = self.records.next()?;
        self.position += 1;
        if record.len() != self.fields.len() {
            return Some(Err(BlendError::Input(format!(
                "record {} has {} fields, header has {}",
                self.position,
                record.len(),
                self.fields.len()
            ))));
        }
        Some(Ok(record))
    }
}
