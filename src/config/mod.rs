//! Configuration loading.
//!
//! Settings are read from the `"impulse"` key of a JSON settings object,
//! merged over the defaults and validated.

pub mod schema;

pub use schema::WorkbenchConfig;

use log::warn;
use serde_json::Value;
use std::path::Path;

/// Key of the workbench section in a settings object.
pub const SETTINGS_KEY: &str = "impulse";

/// Loads configuration from a settings JSON value.
///
/// A missing `"impulse"` section yields the defaults. A section that does
/// not parse is logged and ignored.
///
/// # Arguments
///
/// * `settings_json` - Optional settings object with an `"impulse"` key
///
/// # Returns
///
/// The loaded configuration, or `Err` if validation fails.
///
/// # Example
///
/// ```
/// use impulse::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({
///     "impulse": {
///         "storeRoot": "/tmp/requests",
///         "httpTimeoutMs": 5000
///     }
/// });
///
/// let config = load_config(Some(settings)).unwrap();
/// assert_eq!(config.http_timeout_ms, 5000);
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<WorkbenchConfig, String> {
    let mut config = WorkbenchConfig::default();

    if let Some(section) = settings_json.as_ref().and_then(|s| s.get(SETTINGS_KEY)) {
        match serde_json::from_value::<WorkbenchConfig>(section.clone()) {
            Ok(user_config) => config = config.merge(&user_config),
            Err(e) => warn!("failed to parse {} settings: {}; using defaults", SETTINGS_KEY, e),
        }
    }

    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;

    Ok(config)
}

/// Loads configuration from a JSON settings file.
///
/// # Errors
///
/// Returns `Err` if the file cannot be read, is not JSON, or fails
/// validation.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<WorkbenchConfig, String> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let settings: Value = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    load_config(Some(settings))
}
