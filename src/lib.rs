//! # recordkv
//!
//! Multi-field records over an embedded, ordered key-value store, shaped for
//! workload-driven benchmark harnesses:
//! - Compact, checksummed record encoding into a single store value
//! - Read-modify-write merge for partial updates
//! - Seek-and-advance range scans in key order
//! - One shared store handle per process, opened once and closed once
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Benchmark Harness                          │
//! │           (one RecordClient per worker thread)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Binding: read/scan/update/insert/delete
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   RecordAdapter                              │
//! │        (key formation, merge, scan filtering)                │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │  Record Codec   │                │  StoreManager   │
//!   │ (encode/decode) │                │ (open once,     │
//!   └─────────────────┘                │  close once)    │
//!                                      └────────┬────────┘
//!                                               │
//!                                               ▼
//!                                      ┌─────────────────┐
//!                                      │    KvStore      │
//!                                      │ (redb / memory) │
//!                                      └─────────────────┘
//! ```
//!
//! ## Known Limitations
//! - With the default `KeyLayout::Flat`, table names are ignored and all
//!   tables share one key space.
//! - With the default `ScanFilter::KeyMembership`, a scan's field set is
//!   matched against record *keys*, not field names.
//! - Concurrent updates to one key can lose a merge (see [`adapter`]).

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod store;
pub mod lifecycle;
pub mod adapter;
pub mod binding;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RecordKvError, Result};
pub use config::{Backend, Config, KeyLayout, ScanFilter};
pub use record::{FieldSet, Record};
pub use lifecycle::StoreManager;
pub use adapter::RecordAdapter;
pub use binding::{Binding, RecordClient, Status};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of recordkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
