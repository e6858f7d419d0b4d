//! Linkage strategies for agglomerative clustering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ClusterError;

/// How the distance between two clusters is derived from member distances.
///
/// # Example
///
/// ```
/// use convo_cluster_core::clustering::Linkage;
///
/// assert_eq!(Linkage::default(), Linkage::Complete);
/// assert_eq!("average".parse::<Linkage>().unwrap(), Linkage::Average);
/// assert!("ward".parse::<Linkage>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Maximum pairwise distance. Tight, homogeneous groups.
    #[default]
    Complete,
    /// Size-weighted mean pairwise distance.
    Average,
    /// Minimum pairwise distance. Prone to chaining.
    Single,
}

impl Linkage {
    /// Wire name of this linkage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Linkage::Complete => "complete",
            Linkage::Average => "average",
            Linkage::Single => "single",
        }
    }

    /// Lance-Williams update: distance from the union of clusters `a` and `b`
    /// (sizes `size_a`, `size_b`) to a third cluster `k`.
    #[inline]
    pub fn merged_distance(&self, d_ak: f32, d_bk: f32, size_a: usize, size_b: usize) -> f32 {
        match self {
            Linkage::Complete => d_ak.max(d_bk),
            Linkage::Single => d_ak.min(d_bk),
            Linkage::Average => {
                let (na, nb) = (size_a as f32, size_b as f32);
                (na * d_ak + nb * d_bk) / (na + nb)
            }
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Linkage {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "complete" => Ok(Linkage::Complete),
            "average" => Ok(Linkage::Average),
            "single" => Ok(Linkage::Single),
            other => Err(ClusterError::invalid_parameter(format!(
                "unknown linkage '{}'; valid values: complete, average, single",
                other
            ))),
        }
    }
}
