//! Similarity and distance computation over conversation embeddings.

mod distance;

pub use distance::{cosine_distance, cosine_similarity, DistanceMatrix};
