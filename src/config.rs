use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::virtualizer::{
    DEFAULT_OVERSCAN, DEFAULT_ROW_HEIGHT, DEFAULT_VIEWPORT_HEIGHT, ViewportMetrics,
};

/// Tunables of a table instance
///
/// Every field has a default, so a config file only needs to name the
/// values it changes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableConfig {
    /// Estimated height of one row in pixels
    pub row_height: f64,

    /// Height of the scrollable viewport in pixels
    pub viewport_height: f64,

    /// Rows realized beyond each edge of the viewport
    pub overscan: usize,

    /// Quiet time before typed filter text is committed
    pub debounce_ms: u64,

    /// Column sorted ascending when a table is created
    pub default_sort_column: String,

    /// Data file loaded at startup
    pub source: Option<PathBuf>,

    /// File backing the preference store; in-memory when unset
    pub storage_path: Option<PathBuf>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_height: DEFAULT_ROW_HEIGHT,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            overscan: DEFAULT_OVERSCAN,
            debounce_ms: 300,
            default_sort_column: "Domain".to_string(),
            source: None,
            storage_path: None,
        }
    }
}

impl TableConfig {
    /// Read a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Read `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn viewport(&self) -> ViewportMetrics {
        ViewportMetrics {
            scroll_offset: 0.0,
            viewport_height: self.viewport_height,
            row_height: self.row_height,
            overscan: self.overscan,
        }
    }
}
