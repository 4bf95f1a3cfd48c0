//! Record Adapter
//!
//! Implements the five record operations on top of the store primitives and
//! the record codec.
//!
//! ## Operation Mapping
//! ```text
//!   insert ──► encode ──► put
//!   read   ──► get ──► decode ──► project
//!   update ──► get ──► decode (or empty) ──► merge ──► encode ──► put
//!   scan   ──► cursor ──► seek ──► (peek, decode, advance) x count
//!   delete ──► delete
//! ```
//!
//! ## Store Handle
//! Each operation takes the shared handle through
//! [`StoreManager::acquire`]. The first operation may open the store; once it
//! has been closed, operations fail with `StoreClosed` instead of reopening.
//!
//! ## Update Is Not Atomic
//! The read and the write of an update are two separate engine calls. Two
//! updates racing on one key can lose one of the merges. No per-key lock is
//! taken here; callers needing stronger guarantees must serialize updates to
//! a key themselves.

use std::sync::Arc;

use crate::config::{KeyLayout, ScanFilter};
use crate::error::{RecordKvError, Result};
use crate::lifecycle::StoreManager;
use crate::record::{self, FieldSet, Record};

/// Separator between table name and key under `KeyLayout::TablePrefixed`
const TABLE_SEPARATOR: u8 = 0x00;

/// Record-level view of the shared store
#[derive(Debug, Clone)]
pub struct RecordAdapter {
    manager: Arc<StoreManager>,
}

impl RecordAdapter {
    pub fn new(manager: Arc<StoreManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<StoreManager> {
        &self.manager
    }

    /// Write the full record at `key`, replacing whatever was there
    pub fn insert(&self, table: &str, key: &[u8], record: &Record) -> Result<()> {
        let store = self.manager.acquire()?;
        let storage_key = self.storage_key(table, key);
        let encoded = record::encode(record)?;

        tracing::trace!(
            "insert key={} fields={} bytes={}",
            String::from_utf8_lossy(key),
            record.len(),
            encoded.len()
        );

        store.put(&storage_key, &encoded)
    }

    /// Read the record at `key`, keeping only `fields` (all if `None`/empty)
    ///
    /// An absent key is `NotFound`; a value that fails to decode is
    /// `CorruptRecord` or `UnsupportedType`.
    pub fn read(&self, table: &str, key: &[u8], fields: Option<&FieldSet>) -> Result<Record> {
        let store = self.manager.acquire()?;
        let storage_key = self.storage_key(table, key);

        let bytes = store.get(&storage_key)?.ok_or(RecordKvError::NotFound)?;
        let record = record::decode_fields(&bytes, fields)?;

        tracing::trace!(
            "read key={} fields={}",
            String::from_utf8_lossy(key),
            record.len()
        );

        Ok(record)
    }

    /// Merge `partial` into the record at `key`
    ///
    /// Missing keys start from an empty record. If the stored value does not
    /// decode, nothing is written and the stored bytes stay as they were.
    pub fn update(&self, table: &str, key: &[u8], partial: &Record) -> Result<()> {
        let store = self.manager.acquire()?;
        let storage_key = self.storage_key(table, key);

        let mut merged = match store.get(&storage_key)? {
            Some(bytes) => record::decode(&bytes)?,
            None => Record::new(),
        };
        merged.merge(partial);

        let encoded = record::encode(&merged)?;

        tracing::trace!(
            "update key={} changed={} total={}",
            String::from_utf8_lossy(key),
            partial.len(),
            merged.len()
        );

        store.put(&storage_key, &encoded)
    }

    /// Visit up to `count` keys starting at the first key >= `start_key`
    ///
    /// Returns `(key, record)` pairs in key order. Running out of keys
    /// before `count` is not an error. How `fields` applies depends on the
    /// configured [`ScanFilter`]. Any decode failure aborts the scan.
    pub fn scan(
        &self,
        table: &str,
        start_key: &[u8],
        count: usize,
        fields: Option<&FieldSet>,
    ) -> Result<Vec<(Vec<u8>, Record)>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let store = self.manager.acquire()?;
        let prefix = self.table_prefix(table);
        let filter = self.manager.config().scan_filter;
        let wanted = fields.filter(|f| !f.is_empty());

        let mut seek_key = prefix.clone();
        seek_key.extend_from_slice(start_key);

        let mut cursor = store.cursor()?;
        cursor.seek(&seek_key)?;

        let mut results = Vec::with_capacity(count.min(1024));
        let mut visited = 0;

        while visited < count {
            let Some((raw_key, raw_value)) = cursor.peek() else {
                break;
            };
            // Past the end of this table's key range
            let Some(key) = raw_key.strip_prefix(prefix.as_slice()) else {
                break;
            };

            match (filter, wanted) {
                (_, None) => {
                    results.push((key.to_vec(), record::decode(raw_value)?));
                }
                (ScanFilter::KeyMembership, Some(names)) => {
                    let name = String::from_utf8_lossy(key);
                    if names.contains(&*name) {
                        results.push((key.to_vec(), record::decode(raw_value)?));
                    }
                }
                (ScanFilter::Projection, Some(names)) => {
                    let record = record::decode_fields(raw_value, Some(names))?;
                    results.push((key.to_vec(), record));
                }
            }

            cursor.advance()?;
            visited += 1;
        }

        tracing::trace!(
            "scan start={} visited={} returned={}",
            String::from_utf8_lossy(start_key),
            visited,
            results.len()
        );

        Ok(results)
    }

    /// Remove the record at `key`. Removing an absent key succeeds.
    pub fn delete(&self, table: &str, key: &[u8]) -> Result<()> {
        let store = self.manager.acquire()?;
        let storage_key = self.storage_key(table, key);

        tracing::trace!("delete key={}", String::from_utf8_lossy(key));

        store.delete(&storage_key)
    }

    // =========================================================================
    // Key Formation
    // =========================================================================

    /// Storage key for `(table, key)` under the configured layout
    pub fn storage_key(&self, table: &str, key: &[u8]) -> Vec<u8> {
        let mut storage_key = self.table_prefix(table);
        storage_key.extend_from_slice(key);
        storage_key
    }

    fn table_prefix(&self, table: &str) -> Vec<u8> {
        match self.manager.config().key_layout {
            KeyLayout::Flat => Vec::new(),
            KeyLayout::TablePrefixed => {
                let mut prefix = Vec::with_capacity(table.len() + 1);
                prefix.extend_from_slice(table.as_bytes());
                prefix.push(TABLE_SEPARATOR);
                prefix
            }
        }
    }
}
