//! In-memory backend
//!
//! BTreeMap wrapped in a parking_lot RwLock: ordered keys for cursors, many
//! concurrent readers, one writer at a time. Contents vanish with the store.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use super::{KvPair, KvStore, StoreCursor};
use crate::error::Result;

/// Ordered in-process store
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// First entry inside `bounds`, under a short read lock
    fn first_in(&self, bounds: (Bound<&[u8]>, Bound<&[u8]>)) -> Option<KvPair> {
        self.data
            .read()
            .range::<[u8], _>(bounds)
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn cursor(&self) -> Result<Box<dyn StoreCursor + '_>> {
        let mut cursor = MemoryCursor {
            store: self,
            current: None,
        };
        cursor.seek(&[])?;
        Ok(Box::new(cursor))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Cursor over a [`MemoryStore`]
///
/// Not a snapshot: each step sees writes committed since the previous one.
pub struct MemoryCursor<'a> {
    store: &'a MemoryStore,
    current: Option<KvPair>,
}

impl StoreCursor for MemoryCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> Result<()> {
        self.current = self.store.first_in((Bound::Included(key), Bound::Unbounded));
        Ok(())
    }

    fn peek(&self) -> Option<&KvPair> {
        self.current.as_ref()
    }

    fn advance(&mut self) -> Result<()> {
        if let Some((key, _)) = self.current.take() {
            self.current = self.store.first_in((Bound::Excluded(&key[..]), Bound::Unbounded));
        }
        Ok(())
    }
}
