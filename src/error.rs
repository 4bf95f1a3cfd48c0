//! Error types for recordkv
//!
//! Provides a unified error type for all operations. The harness boundary
//! coarsens these into a [`Status`](crate::binding::Status).

use thiserror::Error;

/// Result type alias using RecordKvError
pub type Result<T> = std::result::Result<T, RecordKvError>;

/// Unified error type for recordkv operations
#[derive(Debug, Error)]
pub enum RecordKvError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Record not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Unsupported field type: {0}")]
    UnsupportedType(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(String),

    #[error("Failed to open store at {path}: {reason}")]
    StoreOpen { path: String, reason: String },

    #[error("Store is not open")]
    StoreClosed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordKvError {
    /// True for failures caused by the bytes stored at a key
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            RecordKvError::CorruptRecord(_) | RecordKvError::UnsupportedType(_)
        )
    }
}

// =============================================================================
// Engine error conversions
// =============================================================================

impl From<redb::Error> for RecordKvError {
    fn from(e: redb::Error) -> Self {
        RecordKvError::Store(e.to_string())
    }
}

macro_rules! store_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for RecordKvError {
                fn from(e: $ty) -> Self {
                    RecordKvError::Store(e.to_string())
                }
            }
        )*
    };
}

store_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
