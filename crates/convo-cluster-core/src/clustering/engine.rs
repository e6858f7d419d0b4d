//! HybridClusteringEngine: one batch in, one [`ClusteringResult`] out.
//!
//! Pipeline:
//! 1. Join inputs by conversation id ([`BatchIndex`])
//! 2. Stage 1: agglomerative clustering over cosine distance
//! 3. Stage 2: facet sub-grouping inside each coarse cluster
//! 4. Consolidation passes
//! 5. Aggregation into the result
//!
//! # Usage
//!
//! ```
//! use convo_cluster_core::clustering::HybridClusteringEngine;
//! use convo_cluster_core::types::{ActionType, ConversationEmbedding, Direction, FacetRecord};
//! use uuid::Uuid;
//!
//! let engine = HybridClusteringEngine::with_defaults();
//! let embeddings = vec![
//!     ConversationEmbedding::new("c1", vec![1.0, 0.0]),
//!     ConversationEmbedding::new("c2", vec![0.99, 0.05]),
//! ];
//! let facets = vec![
//!     FacetRecord::new("c1", ActionType::BugReport, Direction::Excess),
//!     FacetRecord::new("c2", ActionType::BugReport, Direction::Deficit),
//! ];
//!
//! let result = engine.cluster_batch(Uuid::new_v4(), &embeddings, &facets, None);
//! assert!(result.success);
//! // Same topic, opposite direction: never the same cluster.
//! assert_eq!(result.hybrid_clusters_count, 2);
//! ```

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, DEFAULT_MAX_BATCH_SIZE};
use crate::types::{
    ClusteringInput, ClusteringResult, ConversationEmbedding, FacetRecord, ThemeRecord,
};

use super::agglomerative::{AgglomerativeClusterer, AgglomerativeParams, CoarseClustering};
use super::aggregate::{
    embedding_clustering_failed, ResultAggregator, NO_CLUSTERABLE_ERROR, NO_EMBEDDINGS_ERROR,
};
use super::consolidate::Consolidator;
use super::error::ClusterError;
use super::input::BatchIndex;
use super::subgroup::FacetSubgrouper;

/// Stateless clustering engine. Immutable after construction, so one
/// instance can serve concurrent invocations.
#[derive(Debug, Clone)]
pub struct HybridClusteringEngine {
    clusterer: AgglomerativeClusterer,
    subgrouper: FacetSubgrouper,
    /// `None` disables consolidation.
    consolidator: Option<Consolidator>,
    max_batch_size: usize,
}

impl Default for HybridClusteringEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl HybridClusteringEngine {
    pub fn new(params: AgglomerativeParams, consolidator: Option<Consolidator>) -> Self {
        Self {
            clusterer: AgglomerativeClusterer::new(params),
            subgrouper: FacetSubgrouper::new(),
            consolidator,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Default threshold and linkage, default consolidation rules.
    pub fn with_defaults() -> Self {
        Self::new(AgglomerativeParams::default(), Some(Consolidator::default()))
    }

    /// Build from loaded configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        let consolidator = config
            .consolidation
            .enabled
            .then(|| config.consolidation.consolidator());
        Self::new(config.clustering.agglomerative_params(), consolidator)
            .with_max_batch_size(config.clustering.max_batch_size)
    }

    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    #[must_use]
    pub fn without_consolidation(mut self) -> Self {
        self.consolidator = None;
        self
    }

    pub fn params(&self) -> &AgglomerativeParams {
        self.clusterer.params()
    }

    pub fn consolidator(&self) -> Option<&Consolidator> {
        self.consolidator.as_ref()
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Cluster an owned input bundle.
    pub fn cluster_input(&self, run_id: Uuid, input: &ClusteringInput) -> ClusteringResult {
        self.cluster_batch(run_id, &input.embeddings, &input.facets, input.themes())
    }

    /// Cluster one batch.
    ///
    /// Never panics and never returns `Err`: input and algorithm failures are
    /// reported through `errors` with `success = false` and no clusters.
    #[instrument(
        skip(self, embeddings, facets, themes),
        fields(run_id = %run_id),
        level = "debug"
    )]
    pub fn cluster_batch(
        &self,
        run_id: Uuid,
        embeddings: &[ConversationEmbedding],
        facets: &[FacetRecord],
        themes: Option<&[ThemeRecord]>,
    ) -> ClusteringResult {
        info!(
            run_id = %run_id,
            embeddings = embeddings.len(),
            facets = facets.len(),
            themes = themes.map_or(0, <[ThemeRecord]>::len),
            "Clustering run started"
        );

        let index = BatchIndex::build(embeddings, facets, themes);
        let total = index.len();
        let aggregator =
            ResultAggregator::new(run_id, index.fallback().to_vec()).with_total_conversations(total);

        if embeddings.is_empty() {
            warn!(run_id = %run_id, "{}", NO_EMBEDDINGS_ERROR);
            return aggregator.fail(NO_EMBEDDINGS_ERROR);
        }
        if index.is_empty() {
            warn!(run_id = %run_id, "{}", NO_CLUSTERABLE_ERROR);
            return aggregator.fail(NO_CLUSTERABLE_ERROR);
        }

        if let Some(consolidator) = &self.consolidator {
            if let Err(e) = consolidator.validate() {
                warn!(run_id = %run_id, error = %e, "Invalid consolidation configuration");
                return aggregator.fail(format!("Consolidation configuration invalid: {}", e));
            }
        }

        let coarse = match self.stage_one(&index) {
            Ok(coarse) => coarse,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Embedding clustering failed");
                return aggregator.fail(embedding_clustering_failed(&e));
            }
        };
        let aggregator = aggregator.with_embedding_clusters(coarse.cluster_count);

        let clusters = self.subgrouper.subgroup(&coarse, &index);
        let clusters = match &self.consolidator {
            Some(consolidator) => consolidator.consolidate(clusters, &index).0,
            None => clusters,
        };

        let result = aggregator.finish(clusters);

        info!(
            run_id = %run_id,
            total_conversations = result.total_conversations,
            embedding_clusters = result.embedding_clusters_count,
            hybrid_clusters = result.hybrid_clusters_count,
            fallback = result.fallback_conversations.len(),
            "Clustering run finished"
        );

        result
    }

    fn stage_one(&self, index: &BatchIndex<'_>) -> Result<CoarseClustering, ClusterError> {
        // Parameters are checked even when the batch is too small to need them.
        self.clusterer.params().validate()?;

        if index.len() > self.max_batch_size {
            return Err(ClusterError::BatchTooLarge {
                limit: self.max_batch_size,
                actual: index.len(),
            });
        }

        let ids: Vec<&str> = index.profiles().iter().map(|p| p.conversation_id).collect();
        let vectors: Vec<&[f32]> = index.profiles().iter().map(|p| p.vector).collect();
        self.clusterer.fit(&ids, &vectors)
    }
}
