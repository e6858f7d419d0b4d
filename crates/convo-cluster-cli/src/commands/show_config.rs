//! Show-config command: prints the effective configuration as TOML.
//!
//! # Usage
//!
//! ```bash
//! convo-cluster show-config --config config/production.toml
//! ```

use std::path::PathBuf;

use clap::Args;
use tracing::error;

use convo_cluster_core::EngineConfig;

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Arguments for the show-config command.
#[derive(Args, Debug)]
pub struct ShowConfigArgs {
    /// TOML configuration file (defaults to the layered config/ directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Print the configuration to stdout.
///
/// # Returns
///
/// Exit code:
/// - 0: Configuration printed
/// - 1: Configuration could not be rendered
pub fn handle_show_config(config: &EngineConfig) -> i32 {
    match config.to_toml_string() {
        Ok(rendered) => {
            print!("{}", rendered);
            EXIT_SUCCESS
        }
        Err(e) => {
            error!("Failed to render configuration: {}", e);
            EXIT_ERROR
        }
    }
}
