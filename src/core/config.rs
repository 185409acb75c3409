/*!
 * Bridge Configuration
 *
 * Startup properties for locating and configuring the native library.
 * Explicit values always win over the environment.
 */

use super::errors::BridgeError;
use super::limits::{DEFAULT_REGION_CAPACITY, ENV_LIBRARY_PATH, ENV_NATIVE_LOG, ENV_NATIVE_LOG_FILE};
use super::types::BridgeResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Path to the native shared library
    pub library_path: Option<PathBuf>,
    /// Filter expression handed to the native logger
    pub log_filters: Option<String>,
    /// Output file for the native logger; stderr when unset
    pub log_file: Option<PathBuf>,
    /// Initial capacity of each manager's allocation region
    pub region_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            log_filters: None,
            log_file: None,
            region_capacity: DEFAULT_REGION_CAPACITY,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration seeded from `TSURUGI_FFI_*` environment variables
    pub fn from_env() -> Self {
        Self {
            library_path: env_value(ENV_LIBRARY_PATH).map(PathBuf::from),
            log_filters: env_value(ENV_NATIVE_LOG),
            log_file: env_value(ENV_NATIVE_LOG_FILE).map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        serde_json::from_str(json).map_err(|e| BridgeError::Config(e.to_string()))
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn with_log_filters(mut self, filters: impl Into<String>) -> Self {
        self.log_filters = Some(filters.into());
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_region_capacity(mut self, bytes: usize) -> Self {
        self.region_capacity = bytes;
        self
    }

    /// Resolve the native library path: explicit property, then environment
    pub fn resolve_library_path(&self) -> BridgeResult<PathBuf> {
        if let Some(path) = &self.library_path {
            return Ok(path.clone());
        }
        env_value(ENV_LIBRARY_PATH)
            .map(PathBuf::from)
            .ok_or_else(|| {
                BridgeError::Config(format!(
                    "native library path not set; configure library_path or {}",
                    ENV_LIBRARY_PATH
                ))
            })
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
