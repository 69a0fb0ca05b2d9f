//! In-memory vector index over ingested chunks.
//!
//! Built at most once per session and immutable afterwards. Cosine similarity
//! is computed in Rust; at classroom scale a linear scan is enough.

use crate::embedding::Embedder;
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Maximum number of chunks a query may return.
pub const MAX_NEAREST: usize = 3;

/// One indexed chunk with its embedding.
#[derive(Debug, Clone)]
struct IndexedChunk {
    text: String,
    embedding: Vec<f32>,
}

/// Immutable vector index over the session's ingested material.
pub struct VectorIndex {
    chunks: Vec<IndexedChunk>,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    /// Build an index from text chunks, embedding them in order.
    #[instrument(skip(chunks, embedder), fields(count = chunks.len()))]
    pub async fn build(chunks: Vec<String>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let embeddings = embedder.embed_batch(&chunks).await?;

        let chunks: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| IndexedChunk { text, embedding })
            .collect();

        info!("Built vector index with {} chunks", chunks.len());
        Ok(Self { chunks, embedder })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Return up to `min(k, MAX_NEAREST)` chunk texts nearest to the query,
    /// nearest first. Ties keep embedding order (the sort is stable).
    pub async fn nearest(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let k = k.min(MAX_NEAREST);
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(&query_embedding, &chunk.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!("Query matched {} chunks", scored.len());
        Ok(scored
            .into_iter()
            .map(|(i, _)| self.chunks[i].text.clone())
            .collect())
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
