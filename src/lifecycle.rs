//! Store Lifecycle
//!
//! Owns the single shared store handle.
//!
//! ## Responsibilities
//! - Open the engine lazily, at most once per open/close cycle
//! - Provision the data directory before the engine sees it
//! - Hand out shared references to operations
//! - Close the handle once, however many clients ask
//! - Keep a closed store closed until `open` or `attach` is called again
//!
//! ## Concurrency:
//! - `state`: parking_lot RwLock. Operations clone the handle under the read
//!   lock; the write lock is held across the engine open, so racing callers
//!   observe exactly one `RedbStore::open`
//! - `open_count`: atomic counter for diagnostics
//! - After open, the engine's own concurrency control governs every
//!   operation; nothing here is locked per key

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{Backend, Config};
use crate::error::{RecordKvError, Result};
use crate::store::{KvStore, MemoryStore, RedbStore};

/// Guarded owner of the process-wide store handle
///
/// Share it between clients with an `Arc`. Each operation clones the handle
/// for its own duration only; the engine shuts down when the manager has
/// closed and the last in-flight operation drops its reference.
pub struct StoreManager {
    config: Config,
    state: RwLock<ManagerState>,
    open_count: AtomicU64,
}

#[derive(Default)]
struct ManagerState {
    store: Option<Arc<dyn KvStore>>,
    clients: usize,
    /// Set when a close released the handle, cleared by the next open
    closed: bool,
}

impl StoreManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: RwLock::new(ManagerState::default()),
            open_count: AtomicU64::new(0),
        }
    }

    /// Get the shared handle, opening the engine on first use
    ///
    /// Idempotent: once open, every caller receives the same handle.
    pub fn open(&self) -> Result<Arc<dyn KvStore>> {
        if let Some(store) = &self.state.read().store {
            return Ok(Arc::clone(store));
        }

        let mut state = self.state.write();
        self.open_locked(&mut state)
    }

    /// Get the handle for one record operation
    ///
    /// Opens lazily if the store has never been opened, but a store released
    /// by `close` or the last `detach` stays closed: this returns
    /// `StoreClosed` until `open` or `attach` starts a new cycle.
    pub fn acquire(&self) -> Result<Arc<dyn KvStore>> {
        {
            let state = self.state.read();
            if let Some(store) = &state.store {
                return Ok(Arc::clone(store));
            }
            if state.closed {
                return Err(RecordKvError::StoreClosed);
            }
        }

        let mut state = self.state.write();
        if state.closed {
            return Err(RecordKvError::StoreClosed);
        }
        self.open_locked(&mut state)
    }

    /// Release the shared handle
    ///
    /// Returns `true` if a handle was released, `false` if there was nothing
    /// to close. A later `open` starts a fresh cycle.
    pub fn close(&self) -> bool {
        let mut state = self.state.write();
        self.close_locked(&mut state)
    }

    /// Get the shared handle without opening
    pub fn handle(&self) -> Result<Arc<dyn KvStore>> {
        self.state
            .read()
            .store
            .clone()
            .ok_or(RecordKvError::StoreClosed)
    }

    /// Register a client: open if needed and count it
    pub fn attach(&self) -> Result<Arc<dyn KvStore>> {
        let mut state = self.state.write();
        let store = self.open_locked(&mut state)?;
        state.clients += 1;
        tracing::debug!("Client attached ({} active)", state.clients);
        Ok(store)
    }

    /// Unregister a client, closing the store when the last one leaves
    ///
    /// Returns `true` if this call closed the store.
    pub fn detach(&self) -> bool {
        let mut state = self.state.write();
        if state.clients == 0 {
            tracing::warn!("Detach called with no attached clients");
            return false;
        }

        state.clients -= 1;
        tracing::debug!("Client detached ({} active)", state.clients);

        if state.clients == 0 {
            self.close_locked(&mut state)
        } else {
            false
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn is_open(&self) -> bool {
        self.state.read().store.is_some()
    }

    /// How many times the engine has actually been opened
    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::SeqCst)
    }

    pub fn client_count(&self) -> usize {
        self.state.read().clients
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_locked(&self, state: &mut ManagerState) -> Result<Arc<dyn KvStore>> {
        if let Some(store) = &state.store {
            return Ok(Arc::clone(store));
        }

        let store = self.open_engine()?;
        self.open_count.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            "Opened {} store at {}",
            store.name(),
            self.config.data_dir.display()
        );

        state.store = Some(Arc::clone(&store));
        state.closed = false;
        Ok(store)
    }

    fn open_engine(&self) -> Result<Arc<dyn KvStore>> {
        match self.config.backend {
            Backend::Memory => Ok(Arc::new(MemoryStore::new())),
            Backend::Redb => {
                let dir = &self.config.data_dir;
                fs::create_dir_all(dir).map_err(|e| open_error(dir, e))?;

                let path = self.config.database_path();
                let store = RedbStore::open(&path).map_err(|e| open_error(&path, e))?;
                Ok(Arc::new(store))
            }
        }
    }

    fn close_locked(&self, state: &mut ManagerState) -> bool {
        match state.store.take() {
            Some(store) => {
                let in_flight = Arc::strong_count(&store) - 1;
                if in_flight > 0 {
                    tracing::warn!(
                        "Closing store with {} in-flight references; engine shuts down when they finish",
                        in_flight
                    );
                }
                tracing::info!("Closed {} store", store.name());
                state.closed = true;
                true
            }
            None => {
                tracing::debug!("Close called on a store that is not open");
                false
            }
        }
    }
}

fn open_error(path: &Path, err: impl fmt::Display) -> RecordKvError {
    let err = RecordKvError::StoreOpen {
        path: path.display().to_string(),
        reason: err.to_string(),
    };
    tracing::error!("{}", err);
    err
}

impl fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("StoreManager")
            .field("data_dir", &self.config.data_dir)
            .field("backend", &self.config.backend)
            .field("open", &state.store.is_some())
            .field("clients", &state.clients)
            .field("open_count", &self.open_count())
            .finish()
    }
}
