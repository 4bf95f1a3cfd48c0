//! Harness Binding
//!
//! The interface a benchmark harness drives: lifecycle hooks plus the five
//! record operations, each answering with a coarse [`Status`].
//!
//! ## Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND (read only)
//! - 0x02: ERROR
//!
//! Errors are logged with full detail before being reduced to a status.

use std::sync::Arc;

use crate::adapter::RecordAdapter;
use crate::error::{RecordKvError, Result};
use crate::lifecycle::StoreManager;
use crate::record::{FieldSet, Record};

/// Outcome of a record operation as seen by the harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl From<&RecordKvError> for Status {
    fn from(err: &RecordKvError) -> Self {
        match err {
            RecordKvError::NotFound => Status::NotFound,
            _ => Status::Error,
        }
    }
}

/// Storage-adapter contract called by the harness, one instance per client
pub trait Binding {
    /// Called once before the client issues operations
    fn init(&mut self) -> Result<()>;

    /// Called once after the client's last operation
    fn cleanup(&mut self) -> Result<()>;

    /// Read one record into `result`
    fn read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&FieldSet>,
        result: &mut Record,
    ) -> Status;

    /// Read up to `count` records starting at `start_key` into `result`
    fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: Option<&FieldSet>,
        result: &mut Vec<Record>,
    ) -> Status;

    /// Merge `values` into the record at `key`
    fn update(&self, table: &str, key: &str, values: &Record) -> Status;

    /// Write `values` as the whole record at `key`
    fn insert(&self, table: &str, key: &str, values: &Record) -> Status;

    /// Remove the record at `key`
    fn delete(&self, table: &str, key: &str) -> Status;
}

/// [`Binding`] over the shared store
///
/// Every client of a process shares one [`StoreManager`]. `init` registers
/// the client and opens the store if needed; `cleanup` unregisters it and the
/// last client out closes the store.
#[derive(Debug)]
pub struct RecordClient {
    adapter: RecordAdapter,
    attached: bool,
}

impl RecordClient {
    pub fn new(manager: Arc<StoreManager>) -> Self {
        Self {
            adapter: RecordAdapter::new(manager),
            attached: false,
        }
    }

    pub fn adapter(&self) -> &RecordAdapter {
        &self.adapter
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Log a failed operation and reduce it to a status
    fn failed(op: &str, key: &str, err: RecordKvError) -> Status {
        match err {
            RecordKvError::NotFound => {
                tracing::debug!("{} key={}: not found", op, key);
            }
            ref e if e.is_decode_failure() => {
                tracing::error!("{} key={}: stored value unreadable: {}", op, key, e);
            }
            ref e => {
                tracing::error!("{} key={}: {}", op, key, e);
            }
        }
        Status::from(&err)
    }
}

impl Binding for RecordClient {
    fn init(&mut self) -> Result<()> {
        if self.attached {
            return Ok(());
        }

        self.adapter.manager().attach().map_err(|e| {
            tracing::error!("Client init failed: {}", e);
            e
        })?;
        self.attached = true;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if !self.attached {
            return Ok(());
        }

        self.attached = false;
        self.adapter.manager().detach();
        Ok(())
    }

    fn read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&FieldSet>,
        result: &mut Record,
    ) -> Status {
        match self.adapter.read(table, key.as_bytes(), fields) {
            Ok(record) => {
                result.extend(record);
                Status::Ok
            }
            Err(e) => Self::failed("read", key, e),
        }
    }

    fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: Option<&FieldSet>,
        result: &mut Vec<Record>,
    ) -> Status {
        match self.adapter.scan(table, start_key.as_bytes(), count, fields) {
            Ok(records) => {
                result.extend(records.into_iter().map(|(_, record)| record));
                Status::Ok
            }
            Err(e) => Self::failed("scan", start_key, e),
        }
    }

    fn update(&self, table: &str, key: &str, values: &Record) -> Status {
        match self.adapter.update(table, key.as_bytes(), values) {
            Ok(()) => Status::Ok,
            Err(e) => Self::failed("update", key, e),
        }
    }

    fn insert(&self, table: &str, key: &str, values: &Record) -> Status {
        match self.adapter.insert(table, key.as_bytes(), values) {
            Ok(()) => Status::Ok,
            Err(e) => Self::failed("insert", key, e),
        }
    }

    fn delete(&self, table: &str, key: &str) -> Status {
        match self.adapter.delete(table, key.as_bytes()) {
            Ok(()) => Status::Ok,
            Err(e) => Self::failed("delete", key, e),
        }
    }
}

impl Drop for RecordClient {
    fn drop(&mut self) {
        if self.attached {
            tracing::warn!("Client dropped without cleanup; detaching");
            self.adapter.manager().detach();
        }
    }
}
