pub mod embeddings;
pub mod vector_store;

pub use embeddings::{Embedder, EmbeddingClient};
pub use vector_store::{Embedding, ScoredSegment, SimilarityIndex};

use anyhow::{Context, Result};
use tracing::debug;

/// Query used to pull solicitation details out of a folder's documents.
pub const DEFAULT_QUERY: &str = "bid RFP solicitation specifications requirements";

/// Number of segments handed to the extractor.
pub const DEFAULT_TOP_K: usize = 10;

/// Fixed-query top-K retrieval over a [`SimilarityIndex`].
#[derive(Debug, Clone)]
pub struct Retriever {
    query: String,
    top_k: usize,
}

impl Retriever {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
        }
    }

    /// The `top_k` segments closest to the configured query, best first.
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        index: &SimilarityIndex,
    ) -> Result<Vec<ScoredSegment>> {
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = embedder
            .embed(&self.query)
            .await
            .context("Failed to embed retrieval query")?;

        let query_embedding = Embedding::new(query_embedding);
        if query_embedding.dimension() != index.dimension() {
            anyhow::bail!(
                "Query embedding dimension mismatch: index has {}, query has {}",
                index.dimension(),
                query_embedding.dimension()
            );
        }

        let results = index.search(&query_embedding, self.top_k);
        debug!(
            requested = self.top_k,
            returned = results.len(),
            "Retrieved context segments"
        );

        Ok(results)
    }
}

impl Default for Retriever {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY, DEFAULT_TOP_K)
    }
}
