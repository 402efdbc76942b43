//! Embedding vectors and similarity

use serde::{Deserialize, Serialize};

/// A fixed-length embedding vector produced by an embedding model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    model: String,
    vector: Vec<f32>,
}

impl Embedding {
    pub fn new(model: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            model: model.into(),
            vector,
        }
    }

    /// Model that produced this embedding
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    pub fn into_vector(self) -> Vec<f32> {
        self.vector
    }

    pub fn cosine_similarity(&self, other: &[f32]) -> f32 {
        cosine_similarity(&self.vector, other)
    }
}

/// Calculate cosine similarity between two vectors
///
/// Returns 0.0 for vectors of different length, empty vectors and
/// zero-norm vectors, so such pairs never clear a positive threshold.
/// Identical non-zero vectors score exactly 1.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot_product, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    if a == b {
        return 1.0;
    }

    (dot_product / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}
