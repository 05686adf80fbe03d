//! Configuration schema for the workbench.
//!
//! Settings live under the `"impulse"` key of a JSON settings object. Every
//! field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Workbench settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchConfig {
    /// Directory holding request definitions and history logs.
    ///
    /// Relative paths resolve against the process working directory.
    /// Defaults to `"requests"`.
    #[serde(default = "default_store_root")]
    pub store_root: String,

    /// Whether definition files are written indented by two spaces.
    ///
    /// Compact files are smaller but harder to diff. Defaults to true.
    #[serde(default = "default_pretty_definitions")]
    pub pretty_definitions: bool,

    /// Timeout for the native HTTP sender, in milliseconds.
    ///
    /// Covers connecting, sending and reading the whole body. Defaults to
    /// 30000ms.
    ///
    /// Must be greater than 0.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Whether [`Store::open`](crate::store::Store::open) creates a missing
    /// store root. Defaults to true.
    #[serde(default = "default_create_root_if_missing")]
    pub create_root_if_missing: bool,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            store_root: default_store_root(),
            pretty_definitions: default_pretty_definitions(),
            http_timeout_ms: default_http_timeout_ms(),
            create_root_if_missing: default_create_root_if_missing(),
        }
    }
}

impl WorkbenchConfig {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// `Ok(())` if all settings are valid, or `Err` with a descriptive message.
    pub fn validate(&self) -> Result<(), String> {
        if self.store_root.trim().is_empty() {
            return Err("storeRoot must not be empty".to_string());
        }

        if self.http_timeout_ms == 0 {
            return Err("httpTimeoutMs must be greater than 0".to_string());
        }

        Ok(())
    }

    /// The HTTP timeout as a `Duration`.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Merges this configuration with another, using values from `other`.
    pub fn merge(&self, other: &WorkbenchConfig) -> Self {
        Self {
            store_root: other.store_root.clone(),
            pretty_definitions: other.pretty_definitions,
            http_timeout_ms: other.http_timeout_ms,
            create_root_if_missing: other.create_root_if_missing,
        }
    }
}

// Default value functions for serde

fn default_store_root() -> String {
    "requests".to_string()
}

fn default_pretty_definitions() -> bool {
    true
}

fn default_http_timeout_ms() -> u64 {
    30000 // 30 seconds
}

fn default_create_root_if_missing() -> bool {
    true
}
