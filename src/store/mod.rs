//! Store Module
//!
//! The store primitives the adapter is built on: point get/put/delete plus an
//! ordered cursor with seek. Durability and crash consistency belong to the
//! engine behind these traits.
//!
//! ## Backends
//! - [`RedbStore`]: on-disk redb database (one file inside the data directory)
//! - [`MemoryStore`]: ordered in-process map, nothing persisted
//!
//! ## Cursor Model
//! ```text
//!   cursor()  ──► positioned at first key
//!   seek(k)   ──► positioned at first key >= k
//!   peek()    ──► Some((key, value)) | None (exhausted)
//!   advance() ──► next key in byte order
//!   drop      ──► cursor released
//! ```

mod memory;
mod redb_store;

pub use memory::{MemoryCursor, MemoryStore};
pub use redb_store::{RedbCursor, RedbStore};

use crate::error::Result;

/// A key and its raw value, as returned by a cursor
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Ordered byte-string key-value store
///
/// Implementations must be safe to share across threads; per-key write
/// serialization is the engine's job.
pub trait KvStore: Send + Sync {
    /// Get the value stored at `key`, `None` if absent
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Store `value` at `key`, replacing any previous value
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Open a forward cursor positioned at the first key
    fn cursor(&self) -> Result<Box<dyn StoreCursor + '_>>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Forward cursor over a [`KvStore`] in ascending byte order
///
/// The cursor is released when dropped.
pub trait StoreCursor {
    /// Position at the first key >= `key`
    fn seek(&mut self, key: &[u8]) -> Result<()>;

    /// Entry at the current position, `None` once exhausted
    fn peek(&self) -> Option<&KvPair>;

    /// Move to the next key. A no-op once exhausted.
    fn advance(&mut self) -> Result<()>;

    /// True while `peek` would return an entry
    fn has_next(&self) -> bool {
        self.peek().is_some()
    }
}
