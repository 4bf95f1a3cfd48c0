//! redb backend
//!
//! All records live in a single `&[u8] -> &[u8]` table. Every put/delete is
//! its own write transaction; redb serializes writers, which gives per-key
//! linearizability without any locking here.

use std::ops::Bound;
use std::path::{Path, PathBuf};

use redb::{Database, ReadOnlyTable, ReadTransaction, TableDefinition};

use super::{KvPair, KvStore, StoreCursor};
use crate::error::Result;

/// The one table holding every record
const RECORDS: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("records");

/// On-disk store backed by a redb database file
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open or create the database file at `path`
    ///
    /// The parent directory must already exist. The records table is created
    /// up front so read transactions never see it missing.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(RECORDS)?;
        txn.commit()?;

        tracing::debug!("Opened redb store at {}", path.display());

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RECORDS)?;

        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(RECORDS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(RECORDS)?;
            table.remove(key)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn cursor(&self) -> Result<Box<dyn StoreCursor + '_>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RECORDS)?;

        let mut cursor = RedbCursor {
            table,
            _txn: txn,
            current: None,
        };
        cursor.seek(&[])?;

        Ok(Box::new(cursor))
    }

    fn name(&self) -> &'static str {
        "redb"
    }
}

/// Cursor over a read-transaction snapshot of the records table
///
/// Each step re-enters the B-tree just past the current key, so the cursor
/// never holds a live range iterator between calls.
pub struct RedbCursor {
    // Declared before the transaction so it is dropped first
    table: ReadOnlyTable<&'static [u8], &'static [u8]>,
    _txn: ReadTransaction,
    current: Option<KvPair>,
}

impl RedbCursor {
    fn first_of(mut range: redb::Range<'_, &'static [u8], &'static [u8]>) -> Result<Option<KvPair>> {
        match range.next() {
            Some(entry) => {
                let (key, value) = entry?;
                Ok(Some((key.value().to_vec(), value.value().to_vec())))
            }
            None => Ok(None),
        }
    }
}

impl StoreCursor for RedbCursor {
    fn seek(&mut self, key: &[u8]) -> Result<()> {
        let next = Self::first_of(self.table.range::<&[u8]>(key..)?)?;
        self.current = next;
        Ok(())
    }

    fn peek(&self) -> Option<&KvPair> {
        self.current.as_ref()
    }

    fn advance(&mut self) -> Result<()> {
        let after = match &self.current {
            Some((key, _)) => key.clone(),
            None => return Ok(()),
        };

        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Excluded(&after[..]), Bound::Unbounded);
        let next = Self::first_of(self.table.range::<&[u8]>(bounds)?)?;
        self.current = next;
        Ok(())
    }
}
