//! Cluster consolidation.
//!
//! Stage 1 sometimes splits one well-understood issue across several coarse
//! clusters. Consolidation reverses that for curated combinations while
//! keeping every merge inside a `[min_size, max_size]` window.
//!
//! # Passes
//!
//! 1. Single-pack: every cluster inside a single-issue product area merges
//!    into one, across directions
//! 2. Component family: clusters whose members all map onto one family merge
//!    per `(family, direction)`
//! 3. Conjunction: matching conversation ids are pulled out of their clusters
//!    into a new one; the rest of each source cluster stays behind
//! 4. Narrow key: clusters sharing an allow-listed `(direction, product_area)`
//!    key merge
//!
//! A merged cluster is final and never revisited by a later pass. A candidate
//! merge outside the size window leaves its sources untouched.

mod passes;
mod rules;


use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::HybridCluster;

use super::error::ClusterError;
use super::input::BatchIndex;

pub use rules::{ComponentRef, MergePass, MergeRule, MergeRuleTable};

// =============================================================================
// Constants
// =============================================================================

/// Smallest merged cluster worth emitting.
pub const DEFAULT_MIN_SIZE: usize = 3;

/// Largest merged cluster before it stops being actionable.
pub const DEFAULT_MAX_SIZE: usize = 8;

// =============================================================================
// Report
// =============================================================================

/// One merge performed by a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub pass: MergePass,
    pub cluster_id: String,
    /// Clusters that contributed members, in encounter order.
    pub source_cluster_ids: Vec<String>,
    pub size: usize,
}

/// What consolidation did to one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub merges: Vec<MergeRecord>,
    /// Candidate merges left alone because they exceeded `max_size`.
    pub skipped_oversize: usize,
    /// Candidate merges left alone because they fell below `min_size`.
    pub skipped_undersize: usize,
}

impl ConsolidationReport {
    /// Merges performed by one pass.
    pub fn merges_in(&self, pass: MergePass) -> impl Iterator<Item = &MergeRecord> {
        self.merges.iter().filter(move |m| m.pass == pass)
    }

    /// Total candidate merges that were skipped.
    pub fn skipped(&self) -> usize {
        self.skipped_oversize + self.skipped_undersize
    }
}

// =============================================================================
// Consolidator
// =============================================================================

/// Applies the merge rule table to Stage 2 output.
///
/// # Example
///
/// ```
/// use convo_cluster_core::clustering::{Consolidator, MergeRuleTable};
///
/// let consolidator = Consolidator::with_defaults()
///     .with_size_window(2, 10)
///     .with_rules(MergeRuleTable::empty());
/// assert!(consolidator.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Consolidator {
    min_size: usize,
    max_size: usize,
    rules: MergeRuleTable,
}

impl Default for Consolidator {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            rules: MergeRuleTable::default(),
        }
    }
}

impl Consolidator {
    pub fn new(min_size: usize, max_size: usize, rules: MergeRuleTable) -> Self {
        Self {
            min_size,
            max_size,
            rules,
        }
    }

    /// Default window (3..=8) and the default rule table.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_size_window(mut self, min_size: usize, max_size: usize) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: MergeRuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn rules(&self) -> &MergeRuleTable {
        &self.rules
    }

    /// Validate the size window and the rule table.
    ///
    /// # Errors
    ///
    /// `ClusterError::InvalidParameter` if `min_size` is 0, `min_size >
    /// max_size`, or a rule is malformed.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.min_size == 0 {
            return Err(ClusterError::invalid_parameter(
                "min_size must be >= 1; got 0",
            ));
        }
        if self.min_size > self.max_size {
            return Err(ClusterError::invalid_parameter(format!(
                "min_size ({}) must be <= max_size ({})",
                self.min_size, self.max_size
            )));
        }
        self.rules.validate()
    }

    /// Run all passes in order.
    ///
    /// Every conversation id of the input clusters appears in exactly one
    /// output cluster.
    pub fn consolidate(
        &self,
        clusters: Vec<HybridCluster>,
        index: &BatchIndex<'_>,
    ) -> (Vec<HybridCluster>, ConsolidationReport) {
        let input_count = clusters.len();
        let mut work = passes::Workset::new(self, clusters, index);

        for pass in MergePass::all() {
            for rule in self.rules.for_pass(pass) {
                work.apply(rule);
            }
        }

        let (clusters, report) = work.finish();

        debug!(
            input_clusters = input_count,
            output_clusters = clusters.len(),
            merges = report.merges.len(),
            skipped_oversize = report.skipped_oversize,
            skipped_undersize = report.skipped_undersize,
            "Consolidation complete"
        );

        (clusters, report)
    }
}
