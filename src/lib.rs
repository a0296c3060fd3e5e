//! Realtime Sync - Application Library
//!
//! Configuration, logging and binary helpers on top of the `syncsockets`
//! client library.
//!
//! ## Architecture
//!
//! - **config**: YAML configuration with secrets from the environment
//! - **logging**: `tracing` subscriber setup
//! - **bin_common**: Config path resolution for binaries
//! - **syncsockets**: Real-time sync client (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use realtime_sync::bin_common::resolve_config_path;
//! use realtime_sync::config::SyncConfig;
//! ```

// Re-export workspace libraries for convenience
pub use syncsockets;

pub mod config;
pub mod logging;

pub use config::{ConfigError, Environment, SyncConfig};
pub use logging::init_logging_with_level;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{resolve_config_path, CONFIG_PATH_ENV_VAR, DEFAULT_CONFIG_PATH};
}
