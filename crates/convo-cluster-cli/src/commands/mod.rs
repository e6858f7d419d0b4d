//! CLI command handlers
//!
//! # Modules
//!
//! - `run`: Cluster one batch read from JSON files
//! - `show_config`: Print the effective configuration

pub mod run;
pub mod show_config;

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use convo_cluster_core::EngineConfig;

/// Clustering succeeded.
pub const EXIT_SUCCESS: i32 = 0;
/// Invalid input, configuration or I/O failure.
pub const EXIT_ERROR: i32 = 1;
/// The run completed but `success` is false.
pub const EXIT_UNSUCCESSFUL: i32 = 2;

/// Load the configuration named by `--config`, or the layered default.
///
/// Without an explicit path, `config/default.toml`, the environment file and
/// `CONVO_CLUSTER__*` variables are layered; missing files are skipped.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration file");
            EngineConfig::from_file(path)
                .with_context(|| format!("invalid configuration in {}", path.display()))
        }
        None => EngineConfig::load().context("invalid layered configuration"),
    }
}
