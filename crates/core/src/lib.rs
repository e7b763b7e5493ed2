pub mod chunking;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod models;
pub mod synthesizer;
pub mod traits;

pub use chunking::split_text;
pub use corpus::{Corpus, CorpusManager};
pub use embeddings::{
    EmbedderConfig, HttpEmbedder, DEFAULT_EMBEDDING_ENDPOINT, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_EMBEDDING_TIMEOUT,
};
pub use error::{EmbeddingServiceError, IndexError, IngestError, QueryError, SynthesisError};
pub use extractor::{ensure_supported, LopdfExtractor, PdfExtractor, SUPPORTED_MEDIA_TYPE};
pub use index::InMemoryIndex;
pub use models::{Answer, Chunk, ChunkingConfig, IngestOptions, IngestReport, ScoredChunk};
pub use synthesizer::{
    AnthropicChatModel, SynthesizerConfig, DEFAULT_CHAT_ENDPOINT, DEFAULT_CHAT_MODEL,
    DEFAULT_CHAT_TIMEOUT, DEFAULT_MAX_ANSWER_TOKENS, DEFAULT_MAX_CONTEXT_SEGMENTS,
};
pub use traits::{ChatModel, Embedder, VectorIndex};
