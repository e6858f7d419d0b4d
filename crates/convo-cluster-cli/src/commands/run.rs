//! Run command: clusters one batch read from JSON files.
//!
//! # Usage
//!
//! ```bash
//! convo-cluster run \
//!     --embeddings embeddings.json \
//!     --facets facets.json \
//!     --themes themes.json \
//!     --pretty
//! ```
//!
//! Each input file holds a JSON array of records:
//!
//! - embeddings: `{"conversation_id": "...", "vector": [..]}`
//! - facets: `{"conversation_id": "...", "action_type": "...", "direction": "..."}`
//! - themes: `{"conversation_id": "...", "product_area": "...", "component": "..."}`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};
use uuid::Uuid;

use convo_cluster_core::clustering::Linkage;
use convo_cluster_core::{
    ClusteringInput, ClusteringResult, ConversationEmbedding, EngineConfig, FacetRecord,
    HybridClusteringEngine, ThemeRecord,
};

use super::{EXIT_ERROR, EXIT_SUCCESS, EXIT_UNSUCCESSFUL};

/// Arguments for the run command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON array of conversation embeddings
    #[arg(long)]
    pub embeddings: PathBuf,

    /// JSON array of facet records
    #[arg(long)]
    pub facets: PathBuf,

    /// JSON array of theme records (switches Stage 2 to the product-area key)
    #[arg(long)]
    pub themes: Option<PathBuf>,

    /// TOML configuration file (defaults to the layered config/ directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override clustering.distance_threshold
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Override clustering.linkage (complete, average, single)
    #[arg(long)]
    pub linkage: Option<Linkage>,

    /// Override consolidation.min_size
    #[arg(long)]
    pub min_size: Option<usize>,

    /// Override consolidation.max_size
    #[arg(long)]
    pub max_size: Option<usize>,

    /// Skip consolidation and return Stage 2 clusters as-is
    #[arg(long)]
    pub no_consolidation: bool,

    /// Run identifier (random when omitted)
    #[arg(long)]
    pub run_id: Option<Uuid>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}

impl RunArgs {
    /// Fold command-line overrides into the loaded configuration.
    fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(threshold) = self.threshold {
            config.clustering.distance_threshold = threshold;
        }
        if let Some(linkage) = self.linkage {
            config.clustering.linkage = linkage;
        }
        if let Some(min_size) = self.min_size {
            config.consolidation.min_size = min_size;
        }
        if let Some(max_size) = self.max_size {
            config.consolidation.max_size = max_size;
        }
        if self.no_consolidation {
            config.consolidation.enabled = false;
        }
    }
}

/// Execute the run command.
///
/// The result is written even when it is unsuccessful.
///
/// # Returns
///
/// Exit code:
/// - 0: Clustering succeeded
/// - 1: Inputs, configuration or output could not be handled
/// - 2: Clustering ran but reported errors
pub fn handle_run(args: RunArgs, config: EngineConfig) -> i32 {
    match execute(&args, config) {
        Ok(result) if result.success => {
            info!(
                run_id = %result.run_id,
                clusters = result.hybrid_clusters_count,
                "Clustering succeeded"
            );
            EXIT_SUCCESS
        }
        Ok(result) => {
            for message in &result.errors {
                warn!(run_id = %result.run_id, "{}", message);
            }
            EXIT_UNSUCCESSFUL
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            EXIT_ERROR
        }
    }
}

fn execute(args: &RunArgs, mut config: EngineConfig) -> anyhow::Result<ClusteringResult> {
    args.apply_overrides(&mut config);
    config.validate().context("invalid configuration after overrides")?;

    let input = read_input(args)?;
    let run_id = args.run_id.unwrap_or_else(Uuid::new_v4);
    info!(
        run_id = %run_id,
        embeddings = input.embeddings.len(),
        facets = input.facets.len(),
        themes = input.themes().map_or(0, <[ThemeRecord]>::len),
        "Starting clustering run"
    );

    let engine = HybridClusteringEngine::from_config(&config);
    let result = engine.cluster_input(run_id, &input);

    write_result(&result, args.output.as_deref(), args.pretty)?;
    Ok(result)
}

fn read_input(args: &RunArgs) -> anyhow::Result<ClusteringInput> {
    let embeddings: Vec<ConversationEmbedding> = read_json(&args.embeddings)?;
    let facets: Vec<FacetRecord> = read_json(&args.facets)?;
    let input = ClusteringInput::new(embeddings, facets);

    match &args.themes {
        Some(path) => {
            let themes: Vec<ThemeRecord> = read_json(path)?;
            Ok(input.with_themes(themes))
        }
        None => Ok(input),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_result(result: &ClusteringResult, output: Option<&Path>, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    match output {
        Some(path) => fs::write(path, rendered + "\n")
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", rendered);
            Ok(())
        }
    }
}
