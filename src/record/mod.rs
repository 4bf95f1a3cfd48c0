//! Record Module
//!
//! The structured row the harness reads and writes, and the codec that turns
//! it into a single store value.
//!
//! ## Value Format (V1)
//!
//! ```text
//! ┌──────────┬───────────┬──────────────┬─────────────────────┬──────────┐
//! │Magic (2) │Version (1)│FieldCount (4)│ Fields ...          │ CRC32 (4)│
//! └──────────┴───────────┴──────────────┴─────────────────────┴──────────┘
//! ```
//!
//! ### Field Layout
//! ```text
//! ┌────────────┬──────────┬──────────┬─────────────┬──────────┐
//! │NameLen (4) │ Name     │ Type (1) │ValueLen (4) │  Value   │
//! └────────────┴──────────┴──────────┴─────────────┴──────────┘
//! ```
//!
//! ### Type Tags
//! - 0x01: BYTES - opaque byte string

mod codec;

use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashSet;

use bytes::Bytes;

pub use codec::{
    decode, decode_fields, encode, FOOTER_SIZE, FORMAT_VERSION, HEADER_SIZE, MAGIC,
    MAX_FIELD_COUNT, MAX_FIELD_SIZE, TYPE_BYTES,
};

/// Names of the fields a caller wants back. `None` or empty means all.
pub type FieldSet = HashSet<String>;

/// One logical row: unique field names mapped to opaque byte values
///
/// Fields are kept sorted by name so encoding is deterministic. Order carries
/// no meaning beyond that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, Bytes>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, returning the previous value if the name was present
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Option<Bytes> {
        self.fields.insert(name.into(), value.into())
    }

    /// Builder-style `insert`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Bytes> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Bytes> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Overlay `other` onto this record
    ///
    /// Fields named in `other` replace ours; fields it does not mention are
    /// left unchanged.
    pub fn merge(&mut self, other: &Record) {
        for (name, value) in other.iter() {
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Keep only the requested fields
    ///
    /// `None` or an empty set keeps everything. Requested names the record
    /// does not have are ignored.
    pub fn project(self, fields: Option<&FieldSet>) -> Record {
        match fields {
            Some(wanted) if !wanted.is_empty() => Record {
                fields: self
                    .fields
                    .into_iter()
                    .filter(|(name, _)| wanted.contains(name))
                    .collect(),
            },
            _ => self,
        }
    }

    /// Approximate payload size in bytes (names + values)
    pub fn payload_size(&self) -> usize {
        self.fields.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl<N, V> FromIterator<(N, V)> for Record
where
    N: Into<String>,
    V: Into<Bytes>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Record {
            fields: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

impl<N, V> Extend<(N, V)> for Record
where
    N: Into<String>,
    V: Into<Bytes>,
{
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.fields.insert(name.into(), value.into());
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Bytes);
    type IntoIter = btree_map::IntoIter<String, Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Bytes);
    type IntoIter = btree_map::Iter<'a, String, Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
