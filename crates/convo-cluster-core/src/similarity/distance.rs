//! Cosine similarity and the pairwise distance matrix.
//!
//! # All distances are `1 - cosine_similarity`, clamped to [0.0, 2.0]
//!
//! Zero-magnitude vectors have similarity 0.0 with everything (distance 1.0)
//! rather than producing NaN.

use crate::clustering::ClusterError;

/// Cosine similarity between two dense vectors, in [-1.0, 1.0].
///
/// Returns 0.0 for empty, mismatched or zero-magnitude inputs.
/// Accumulates in f64 so near-identical vectors stay near 1.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    ((dot / (mag_a.sqrt() * mag_b.sqrt())) as f32).clamp(-1.0, 1.0)
}

/// Cosine distance, `1 - cosine_similarity`, in [0.0, 2.0].
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}

/// Symmetric N x N cosine distance matrix, stored row-major.
///
/// Memory is O(N^2); callers bound N before building one.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    values: Vec<f32>,
}

impl DistanceMatrix {
    /// Build the matrix from labelled vectors.
    ///
    /// # Errors
    ///
    /// - `ClusterError::DimensionMismatch` if vectors disagree in length
    /// - `ClusterError::NonFiniteValue` if any component is NaN/Infinity
    pub fn from_vectors(ids: &[&str], vectors: &[&[f32]]) -> Result<Self, ClusterError> {
        if ids.len() != vectors.len() {
            return Err(ClusterError::dimension_mismatch(ids.len(), vectors.len()));
        }

        let n = vectors.len();
        if let Some(first) = vectors.first() {
            let dim = first.len();
            for (id, vector) in ids.iter().zip(vectors.iter()) {
                if vector.len() != dim {
                    return Err(ClusterError::dimension_mismatch(dim, vector.len()));
                }
                if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
                    return Err(ClusterError::non_finite(*id, index));
                }
            }
        }

        let mut values = vec![0.0f32; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = cosine_distance(vectors[i], vectors[j]);
                values[i * n + j] = d;
                values[j * n + i] = d;
            }
        }

        Ok(Self { n, values })
    }

    /// Wrap a precomputed square matrix.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the matrix is not square, not symmetric, has a
    /// non-zero diagonal, or contains negative / non-finite entries.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, ClusterError> {
        let n = rows.len();
        let mut values = Vec::with_capacity(n * n);

        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(ClusterError::dimension_mismatch(n, row.len()));
            }
            for (j, &val) in row.iter().enumerate() {
                if !val.is_finite() || val < 0.0 {
                    return Err(ClusterError::invalid_parameter(format!(
                        "distance_matrix[{}][{}] = {} must be finite and >= 0",
                        i, j, val
                    )));
                }
                if i == j && val != 0.0 {
                    return Err(ClusterError::invalid_parameter(format!(
                        "distance_matrix[{}][{}] diagonal must be 0, got {}",
                        i, j, val
                    )));
                }
            }
            values.extend_from_slice(row);
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if (values[i * n + j] - values[j * n + i]).abs() > 1e-6 {
                    return Err(ClusterError::invalid_parameter(format!(
                        "distance_matrix is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }

        Ok(Self { n, values })
    }

    /// Number of rows (and columns).
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Distance between items `i` and `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.n + j]
    }

    /// Row `i` as a slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.n..(i + 1) * self.n]
    }
}
