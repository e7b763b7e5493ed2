use crate::error::{EmbeddingServiceError, IndexError, SynthesisError};
use crate::models::ScoredChunk;
use async_trait::async_trait;

/// Maps text to fixed-dimension vectors via a remote embedding model. Chunk
/// and query embeddings must come from the same model so their dimensions
/// match within one corpus.
#[async_trait]
pub trait Embedder {
    /// One vector per input text, order-preserving. No partial results: any
    /// failure fails the whole batch.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingServiceError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError>;
}

/// Synthesizes a grounded answer from a question and retrieved context,
/// highest-similarity context first. Stateless across calls.
#[async_trait]
pub trait ChatModel {
    async fn answer(
        &self,
        question: &str,
        context: &[ScoredChunk],
    ) -> Result<String, SynthesisError>;
}

/// Nearest-neighbor search over stored chunk vectors. Search is a pure
/// function of index state.
pub trait VectorIndex {
    /// At most `top_k` chunks, descending similarity, ties broken by source
    /// order.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, IndexError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
