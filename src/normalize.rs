//! Identifier Normalization
//!
//! Column names come straight from CSV headers and may contain anything:
//! whitespace, quotes, SQL keywords. The storage layer never sees them.
//! Each name is replaced by the decimal CRC32 of its UTF-8 bytes, and a
//! mapping table keeps the way back to the original name.

/// Map a column name to a storage-safe token
///
/// The token is the unsigned CRC32 (IEEE) of the UTF-8 bytes rendered in
/// decimal, so it only ever contains ASCII digits. Two names sharing a
/// checksum would collide; with CSV-sized column counts this is accepted.
pub fn normalize(name: &str) -> String {
    crc32fast::hash(name.as_bytes()).to_string()
}

/// Ordered mapping from normalized token to original column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedColumns {
    /// (token, original name) in declared order
    entries: Vec<(String, String)>,
}

impl NormalizedColumns {
    /// Normalize every name, keeping the given order
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                (normalize(name), name.to_string())
            })
            .collect();
        Self { entries }
    }

    /// Tokens in declared order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(token, _)| token.as_str())
    }

    /// Original names in declared order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, name)| name.as_str())
    }

    /// (token, name) pairs in declared order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(token, name)| (token.as_str(), name.as_str()))
    }

    /// Reverse lookup: the original name behind a token
    pub fn name_of(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, name)| name.as_str())
    }

    /// Check whether a token is part of the mapping
    pub fn contains(&self, token: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
