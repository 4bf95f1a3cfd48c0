//! Configuration for recordkv
//!
//! Centralized configuration with sensible defaults. The harness hands the
//! binding a flat property map; [`Config::from_properties`] turns it into a
//! typed `Config`.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{RecordKvError, Result};

/// Property key for the on-disk store directory
pub const PROPERTY_DIR: &str = "recordkv.dir";

/// Property key selecting the storage backend
pub const PROPERTY_BACKEND: &str = "recordkv.backend";

/// Property key selecting how (table, key) becomes a storage key
pub const PROPERTY_KEY_LAYOUT: &str = "recordkv.key_layout";

/// Property key selecting how scans apply the requested field set
pub const PROPERTY_SCAN_FILTER: &str = "recordkv.scan_filter";

/// Main configuration for a recordkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the engine's native files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── records.redb     (redb database file)
    pub data_dir: PathBuf,

    /// Which engine backs the store
    pub backend: Backend,

    // -------------------------------------------------------------------------
    // Adapter Configuration
    // -------------------------------------------------------------------------
    /// How (table, key) pairs are collapsed into one storage key
    pub key_layout: KeyLayout,

    /// How scans interpret the requested field set
    pub scan_filter: ScanFilter,
}

/// Storage engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// On-disk redb database inside `data_dir`
    Redb,

    /// Process-local ordered map; nothing is written to disk
    Memory,
}

/// Storage key formation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLayout {
    /// Table name is ignored; all tables share one key space
    Flat,

    /// Key is `table ++ 0x00 ++ key`; scans stay inside the table
    TablePrefixed,
}

/// Scan field-set semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFilter {
    /// A record is kept only if its *key* is in the field set.
    /// Kept records carry every field.
    KeyMembership,

    /// Every visited record is kept, projected onto the field set
    Projection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./recordkv_data"),
            backend: Backend::Redb,
            key_layout: KeyLayout::Flat,
            scan_filter: ScanFilter::KeyMembership,
        }
    }
}

impl Config {
    /// Name of the redb file inside `data_dir`
    pub const DATABASE_FILENAME: &'static str = "records.redb";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Path of the redb database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(Self::DATABASE_FILENAME)
    }

    /// Build a config from harness properties
    ///
    /// `recordkv.dir` is required; the other keys fall back to defaults.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let data_dir = props
            .get(PROPERTY_DIR)
            .filter(|dir| !dir.trim().is_empty())
            .ok_or_else(|| {
                RecordKvError::Config(format!("missing required property '{}'", PROPERTY_DIR))
            })?;

        let mut builder = Config::builder().data_dir(data_dir.trim());

        if let Some(value) = props.get(PROPERTY_BACKEND) {
            builder = builder.backend(parse_backend(value)?);
        }
        if let Some(value) = props.get(PROPERTY_KEY_LAYOUT) {
            builder = builder.key_layout(parse_key_layout(value)?);
        }
        if let Some(value) = props.get(PROPERTY_SCAN_FILTER) {
            builder = builder.scan_filter(parse_scan_filter(value)?);
        }

        Ok(builder.build())
    }
}

fn parse_backend(value: &str) -> Result<Backend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "redb" => Ok(Backend::Redb),
        "memory" => Ok(Backend::Memory),
        other => Err(invalid_value(PROPERTY_BACKEND, other)),
    }
}

fn parse_key_layout(value: &str) -> Result<KeyLayout> {
    match value.trim().to_ascii_lowercase().as_str() {
        "flat" => Ok(KeyLayout::Flat),
        "table_prefixed" => Ok(KeyLayout::TablePrefixed),
        other => Err(invalid_value(PROPERTY_KEY_LAYOUT, other)),
    }
}

fn parse_scan_filter(value: &str) -> Result<ScanFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "key" => Ok(ScanFilter::KeyMembership),
        "projection" => Ok(ScanFilter::Projection),
        other => Err(invalid_value(PROPERTY_SCAN_FILTER, other)),
    }
}

fn invalid_value(property: &str, value: &str) -> RecordKvError {
    RecordKvError::Config(format!("invalid value '{}' for property '{}'", value, property))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the storage backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set the key layout
    pub fn key_layout(mut self, layout: KeyLayout) -> Self {
        self.config.key_layout = layout;
        self
    }

    /// Set the scan filter semantics
    pub fn scan_filter(mut self, filter: ScanFilter) -> Self {
        self.config.scan_filter = filter;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
