//! Sub-configuration structures for the clustering engine.
//!
//! This module contains the individual configuration structs that make up
//! the main [`EngineConfig`](super::EngineConfig).

use serde::{Deserialize, Serialize};

use crate::clustering::{
    AgglomerativeParams, Consolidator, Linkage, MergeRuleTable, DEFAULT_DISTANCE_THRESHOLD,
    DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE,
};
use crate::error::{CoreError, CoreResult};

/// Largest batch accepted by default (the distance matrix is N x N).
pub const DEFAULT_MAX_BATCH_SIZE: usize = 2000;

/// Stage 1 configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Cosine distance cut height, in (0.0, 2.0].
    pub distance_threshold: f32,
    pub linkage: Linkage,
    /// Batches above this size are refused.
    pub max_batch_size: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            linkage: Linkage::default(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl ClusteringConfig {
    pub fn agglomerative_params(&self) -> AgglomerativeParams {
        AgglomerativeParams::default()
            .with_distance_threshold(self.distance_threshold)
            .with_linkage(self.linkage)
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.agglomerative_params().validate().map_err(|e| {
            CoreError::validation("clustering.distance_threshold", e.to_string())
        })?;
        if self.max_batch_size == 0 {
            return Err(CoreError::validation(
                "clustering.max_batch_size",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Consolidation configuration: size window and curated rule table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// When false, Stage 2 output is returned as-is.
    pub enabled: bool,
    pub min_size: usize,
    pub max_size: usize,
    pub rules: MergeRuleTable,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            rules: MergeRuleTable::default(),
        }
    }
}

impl ConsolidationConfig {
    pub fn consolidator(&self) -> Consolidator {
        Consolidator::new(self.min_size, self.max_size, self.rules.clone())
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.consolidator()
            .validate()
            .map_err(|e| CoreError::validation("consolidation", e.to_string()))
    }
}

/// Logging configuration, applied by the binary that hosts the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            include_location: false,
        }
    }
}

impl LoggingConfig {
    const FORMATS: [&'static str; 3] = ["pretty", "compact", "json"];

    pub fn validate(&self) -> CoreResult<()> {
        if !Self::FORMATS.contains(&self.format.as_str()) {
            return Err(CoreError::validation(
                "logging.format",
                format!(
                    "unknown format '{}'; valid values: {}",
                    self.format,
                    Self::FORMATS.join(", ")
                ),
            ));
        }
        if self.level.trim().is_empty() {
            return Err(CoreError::validation("logging.level", "must not be empty"));
        }
        Ok(())
    }
}
