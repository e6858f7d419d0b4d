//! Convo Cluster CLI
//!
//! File-based runner for the hybrid conversation clustering engine.
//!
//! # Commands
//!
//! - `run`: Cluster a batch read from JSON files and print the result as JSON
//! - `show-config`: Print the effective configuration as TOML
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Clustering succeeded |
//! | 1 | Invalid input, configuration or I/O failure |
//! | 2 | Run completed but the result is unsuccessful |

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use convo_cluster_core::config::LoggingConfig;

mod commands;

use commands::EXIT_ERROR;

/// Convo Cluster CLI - Hybrid clustering of support conversations
#[derive(Parser)]
#[command(name = "convo-cluster")]
#[command(version)]
#[command(about = "Group support conversations into fine-grained, actionable clusters")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster one batch of conversations
    ///
    /// Reads embeddings, facets and optional theme records from JSON arrays
    /// and writes the clustering result as JSON to stdout or --output.
    Run(commands::run::RunArgs),
    /// Print the effective configuration as TOML
    ShowConfig(commands::show_config::ShowConfigArgs),
}

impl Commands {
    fn config_path(&self) -> Option<&std::path::Path> {
        match self {
            Commands::Run(args) => args.config.as_deref(),
            Commands::ShowConfig(args) => args.config.as_deref(),
        }
    }
}

fn init_logging(verbose: u8, logging: &LoggingConfig) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level)),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.pretty().init(),
    }
}

fn main() {
    let cli = Cli::parse();

    // Configuration is loaded before logging so the logging section applies.
    let config = commands::load_config(cli.command.config_path());
    match &config {
        Ok(config) => init_logging(cli.verbose, &config.logging),
        Err(_) => init_logging(cli.verbose, &LoggingConfig::default()),
    }

    let exit_code = match config {
        Ok(config) => match cli.command {
            Commands::Run(args) => commands::run::handle_run(args, config),
            Commands::ShowConfig(_) => commands::show_config::handle_show_config(&config),
        },
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
