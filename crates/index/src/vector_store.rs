//! In-memory similarity index over one folder's segments.
//!
//! The index is built in a single pass and never updated; a new folder gets
//! a new index.

use anyhow::{Context, Result};
use ingest::Segment;
use tracing::debug;

use crate::embeddings::Embedder;

/// A vector embedding representing text semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity in `[-1.0, 1.0]`; 0.0 for mismatched, zero or
    /// non-finite vectors.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }

        // Accumulate in f64 so large components do not overflow
        let dot: f64 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| f64::from(*a) * f64::from(*b))
            .sum();

        let norm_a = norm(&self.values);
        let norm_b = norm(&other.values);

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        let similarity = (dot / (norm_a * norm_b)) as f32;
        if similarity.is_finite() { similarity } else { 0.0 }
    }
}

fn norm(values: &[f32]) -> f64 {
    values
        .iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

#[derive(Debug, Clone)]
pub struct ScoredSegment {
    pub segment: Segment,
    pub score: f32,
}

#[derive(Debug)]
struct Entry {
    segment: Segment,
    embedding: Embedding,
}

/// Exhaustive cosine-similarity index.
#[derive(Debug)]
pub struct SimilarityIndex {
    entries: Vec<Entry>,
    dimension: usize,
}

impl SimilarityIndex {
    /// Embed every segment and index it. All vectors must share one dimension.
    pub async fn build(embedder: &dyn Embedder, segments: Vec<Segment>) -> Result<Self> {
        let mut entries = Vec::with_capacity(segments.len());
        let mut dimension = 0;

        for segment in segments {
            let values = embedder
                .embed(&segment.text)
                .await
                .context(format!("Failed to embed segment from {}", segment.source))?;

            if values.is_empty() {
                anyhow::bail!("Empty embedding for segment from {}", segment.source);
            }
            if dimension == 0 {
                dimension = values.len();
            } else if values.len() != dimension {
                anyhow::bail!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    dimension,
                    values.len()
                );
            }

            entries.push(Entry {
                segment,
                embedding: Embedding::new(values),
            });
        }

        debug!(segments = entries.len(), dimension, "Built similarity index");

        Ok(Self { entries, dimension })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Up to `limit` segments, most similar first. Ties keep insertion order.
    pub fn search(&self, query: &Embedding, limit: usize) -> Vec<ScoredSegment> {
        let mut scores: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, query.cosine_similarity(&entry.embedding)))
            .collect();

        // Stable sort keeps load order for equal scores
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(limit);

        scores
            .into_iter()
            .map(|(i, score)| ScoredSegment {
                segment: self.entries[i].segment.clone(),
                score,
            })
            .collect()
    }
}
