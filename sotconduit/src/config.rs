//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to deprecated variable names with warning logs, and the entry point that
//! loads [`ConduitConfig`] for the gatekeeper.

use std::path::PathBuf;

use sotconduit_common::config::ConduitConfig;
use sotconduit_common::error::CommonError;

/// 新しい変数名を優先し、旧名のみ設定されている場合は警告を出して採用する
///
/// ```
/// use sotconduit::config::get_env_with_fallback;
///
/// let level = get_env_with_fallback("SOTCONDUIT_LOG_LEVEL", "RUST_LOG");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    let val = std::env::var(old_name).ok()?;
    tracing::warn!(old = old_name, new = new_name, "deprecated environment variable in use");
    Some(val)
}

/// [`get_env_with_fallback`] with a default
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// 値をパースする版。未設定・パース失敗時は `default`
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Path of the configuration file, if any
///
/// `SOTCONDUIT_CONFIG_FILE`（旧: `CONDUIT_CONFIG_FILE`）から取得する。
pub fn config_file_path() -> Option<PathBuf> {
    get_env_with_fallback("SOTCONDUIT_CONFIG_FILE", "CONDUIT_CONFIG_FILE")
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Load the gatekeeper configuration
///
/// Reads the optional file named by [`config_file_path`] and layers
/// `SOTCONDUIT_*` variables on top.
pub fn load_conduit_config() -> Result<ConduitConfig, CommonError> {
    let path = config_file_path();
    let config = ConduitConfig::load(path.as_deref())?;
    tracing::debug!(
        workshop = %config.workshop_name,
        broker_timeout_ms = config.broker_timeout_ms,
        "gatekeeper configuration loaded"
    );
    Ok(config)
}
