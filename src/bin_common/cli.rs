//! Config path resolution for the sync listener

use std::path::PathBuf;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV_VAR: &str = "SYNC_CONFIG_PATH";

/// Config file used when neither an argument nor the env var is given
pub const DEFAULT_CONFIG_PATH: &str = "config/sync_config.yaml";

/// First argument wins, then `SYNC_CONFIG_PATH`, then the default path.
///
/// ```
/// use realtime_sync::bin_common::resolve_config_path;
///
/// let path = resolve_config_path(["custom.yaml".to_string()]);
/// assert_eq!(path.to_str(), Some("custom.yaml"));
/// ```
pub fn resolve_config_path(args: impl IntoIterator<Item = String>) -> PathBuf {
    args.into_iter()
        .next()
        .or_else(|| std::env::var(CONFIG_PATH_ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
        .into()
}
