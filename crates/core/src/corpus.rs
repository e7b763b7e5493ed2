use crate::chunking::split_text;
use crate::error::{IngestError, QueryError};
use crate::extractor::{ensure_supported, LopdfExtractor, PdfExtractor, SUPPORTED_MEDIA_TYPE};
use crate::index::InMemoryIndex;
use crate::models::{Answer, IngestOptions, IngestReport};
use crate::traits::{ChatModel, Embedder, VectorIndex};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// One ingested document's searchable state. Immutable once built; replaced
/// wholesale on the next successful ingestion.
pub struct Corpus {
    pub id: Uuid,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
    index: InMemoryIndex,
}

fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Owns the single active corpus and runs both pipelines against it:
/// extract -> chunk -> embed -> index on ingestion, and
/// embed -> search -> synthesize on query.
///
/// The active corpus lives behind an atomically swapped `Arc`: queries clone
/// the reference once at call start, so a concurrent ingestion can replace
/// the corpus without tearing it out from under an in-flight search. The old
/// corpus is dropped when its last reader finishes.
pub struct CorpusManager<E, C> {
    embedder: E,
    chat: C,
    extractor: LopdfExtractor,
    options: IngestOptions,
    active: RwLock<Option<Arc<Corpus>>>,
}

impl<E, C> CorpusManager<E, C>
where
    E: Embedder + Send + Sync,
    C: ChatModel + Send + Sync,
{
    pub fn new(embedder: E, chat: C, options: IngestOptions) -> Self {
        Self {
            embedder,
            chat,
            extractor: LopdfExtractor,
            options,
            active: RwLock::new(None),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().is_some()
    }

    fn snapshot(&self) -> Option<Arc<Corpus>> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn install(&self, corpus: Corpus) {
        let mut slot = self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Arc::new(corpus));
    }

    /// Ingestion boundary: document bytes plus their declared media type.
    /// On any failure the previously active corpus stays in place.
    pub async fn ingest(&self, bytes: &[u8], media_type: &str) -> Result<IngestReport, IngestError> {
        ensure_supported(media_type)?;
        let text = self.extractor.extract_text(bytes)?;
        self.activate(&text, digest_bytes(bytes)).await
    }

    /// Convenience for filesystem callers: gate on the `.pdf` extension,
    /// then ingest the file's bytes.
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport, IngestError> {
        let is_pdf = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"));

        if !is_pdf {
            return Err(IngestError::UnsupportedFormat(path.display().to_string()));
        }

        let bytes = tokio::fs::read(path).await?;
        self.ingest(&bytes, SUPPORTED_MEDIA_TYPE).await
    }

    /// Build a corpus from already-extracted text. Also the seam the tests
    /// drive the pipeline through.
    pub async fn ingest_text(&self, text: &str) -> Result<IngestReport, IngestError> {
        self.activate(text, digest_bytes(text.as_bytes())).await
    }

    async fn activate(&self, text: &str, checksum: String) -> Result<IngestReport, IngestError> {
        let chunks = split_text(text, &self.options.chunking);
        debug!(chunks = chunks.len(), "chunked document");

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        let index = InMemoryIndex::build(chunks, embeddings)?;

        let corpus = Corpus {
            id: Uuid::new_v4(),
            checksum,
            ingested_at: Utc::now(),
            index,
        };
        let report = IngestReport {
            corpus_id: corpus.id,
            chunk_count: corpus.index.len(),
            checksum: corpus.checksum.clone(),
            ingested_at: corpus.ingested_at,
        };

        info!(corpus_id = %corpus.id, chunks = report.chunk_count, "activating corpus");
        self.install(corpus);

        Ok(report)
    }

    /// Question boundary. Resolves against the corpus that was active when
    /// the call started, regardless of concurrent ingestions.
    pub async fn query(&self, question: &str) -> Result<Answer, QueryError> {
        if question.trim().is_empty() {
            return Err(QueryError::MissingPrompt);
        }

        let corpus = self.snapshot().ok_or(QueryError::NoActiveCorpus)?;

        let query_vector = self.embedder.embed_query(question).await?;
        let sources = corpus.index.search(&query_vector, self.options.top_k)?;
        debug!(corpus_id = %corpus.id, hits = sources.len(), "retrieved context");

        let text = self.chat.answer(question, &sources).await?;

        Ok(Answer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingServiceError, SynthesisError};
    use crate::models::{ChunkingConfig, ScoredChunk};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Deterministic character-trigram hashing embedder: close enough to a
    /// real embedding model for cosine ranking to behave sensibly in tests.
    struct TrigramEmbedder {
        dimensions: usize,
        fail: Arc<AtomicBool>,
    }

    impl TrigramEmbedder {
        fn new() -> Self {
            Self {
                dimensions: 128,
                fail: Arc::new(AtomicBool::new(false)),
            }
        }

        fn vector(&self, text: &str) -> Vec<f32> {
            let mut vector = vec![0f32; self.dimensions];
            let lowered = text.to_lowercase();
            let chars: Vec<char> = lowered.chars().collect();

            for window in chars.windows(3) {
                let token: String = window.iter().collect();
                let mut hash = 1469598103934665603u64;
                for byte in token.bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
                vector[(hash % self.dimensions as u64) as usize] += 1.0;
            }

            let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
            if magnitude > 0.0 {
                for value in &mut vector {
                    *value /= magnitude;
                }
            }

            vector
        }
    }

    #[async_trait]
    impl Embedder for TrigramEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(EmbeddingServiceError::Backend {
                    status: 500,
                    details: "simulated outage".to_string(),
                });
            }
            Ok(texts.iter().map(|text| self.vector(text)).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(EmbeddingServiceError::Backend {
                    status: 500,
                    details: "simulated outage".to_string(),
                });
            }
            Ok(self.vector(text))
        }
    }

    /// Answers from the highest-ranked context segment, or reports unknown
    /// when retrieval produced nothing.
    struct ContextEcho;

    #[async_trait]
    impl ChatModel for ContextEcho {
        async fn answer(
            &self,
            _question: &str,
            context: &[ScoredChunk],
        ) -> Result<String, SynthesisError> {
            match context.first() {
                Some(hit) => Ok(format!("Based on the context: {}", hit.chunk.text)),
                None => Ok("I don't know".to_string()),
            }
        }
    }

    const SKY_DOC: &str = "The sky is blue.\n\nGrass is green.\n\nWater is wet.";

    fn manager() -> CorpusManager<TrigramEmbedder, ContextEcho> {
        let options = IngestOptions {
            chunking: ChunkingConfig {
                max_chars: 20,
                ..ChunkingConfig::default()
            },
            top_k: 10,
        };
        CorpusManager::new(TrigramEmbedder::new(), ContextEcho, options)
    }

    #[tokio::test]
    async fn query_before_any_ingest_fails_with_no_active_corpus() {
        let manager = manager();
        assert!(!manager.is_ready());

        let result = manager.query("What color is the sky?").await;
        assert!(matches!(result, Err(QueryError::NoActiveCorpus)));
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let manager = manager();
        let result = manager.query("   \n").await;
        assert!(matches!(result, Err(QueryError::MissingPrompt)));
    }

    #[tokio::test]
    async fn sky_question_retrieves_the_sky_chunk_first() {
        let manager = manager();
        let report = manager.ingest_text(SKY_DOC).await.expect("ingest should work");
        assert_eq!(report.chunk_count, 3);
        assert!(manager.is_ready());

        let answer = manager
            .query("What color is the sky?")
            .await
            .expect("query should work");

        assert_eq!(answer.sources[0].chunk.source_order, 0);
        assert!(answer.sources[0].chunk.text.contains("sky"));
        assert!(answer.text.contains("blue"));
    }

    #[tokio::test]
    async fn failed_ingest_leaves_the_previous_corpus_serving() {
        let embedder = TrigramEmbedder::new();
        let fail = embedder.fail.clone();
        let manager = CorpusManager::new(
            embedder,
            ContextEcho,
            IngestOptions {
                chunking: ChunkingConfig {
                    max_chars: 20,
                    ..ChunkingConfig::default()
                },
                top_k: 10,
            },
        );

        let first = manager.ingest_text(SKY_DOC).await.expect("ingest should work");

        fail.store(true, Ordering::SeqCst);
        let result = manager.ingest_text("A replacement document.").await;
        assert!(matches!(result, Err(IngestError::Embedding(_))));
        fail.store(false, Ordering::SeqCst);

        assert!(manager.is_ready());
        let snapshot = manager.snapshot().expect("corpus should still be active");
        assert_eq!(snapshot.id, first.corpus_id);

        let answer = manager
            .query("What color is the sky?")
            .await
            .expect("query should work");
        assert!(answer.text.contains("blue"));
    }

    #[tokio::test]
    async fn reingestion_replaces_the_corpus_wholesale() {
        let manager = manager();
        let first = manager.ingest_text(SKY_DOC).await.expect("ingest should work");
        let second = manager
            .ingest_text("The ocean is deep.\n\nSalt fills the sea.")
            .await
            .expect("ingest should work");

        assert_ne!(first.corpus_id, second.corpus_id);
        assert_eq!(second.chunk_count, 2);

        let answer = manager
            .query("How deep is the ocean?")
            .await
            .expect("query should work");
        assert!(answer.text.contains("ocean"));
        for hit in &answer.sources {
            assert!(!hit.chunk.text.contains("sky"));
        }
    }

    #[tokio::test]
    async fn snapshot_taken_before_a_swap_stays_valid() {
        let manager = manager();
        manager.ingest_text(SKY_DOC).await.expect("ingest should work");

        let held = manager.snapshot().expect("corpus should be active");
        manager
            .ingest_text("Entirely new content.")
            .await
            .expect("ingest should work");

        // The replaced corpus is still fully usable through the held Arc.
        assert_eq!(held.index.len(), 3);
        let hits = held
            .index
            .search(&vec![0.0; 128], 3)
            .expect("search should work");
        assert_eq!(hits.len(), 3);

        let current = manager.snapshot().expect("corpus should be active");
        assert_ne!(current.id, held.id);
    }

    #[tokio::test]
    async fn unsupported_upload_does_not_disturb_the_corpus() {
        let manager = manager();
        manager.ingest_text(SKY_DOC).await.expect("ingest should work");

        let result = manager.ingest(b"plain text payload", "text/plain").await;
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
        assert_eq!(
            result.err().map(|error| error.error_code()),
            Some("unsupported-format")
        );

        let answer = manager
            .query("What color is the sky?")
            .await
            .expect("query should work");
        assert!(answer.text.contains("blue"));
    }

    #[tokio::test]
    async fn empty_document_yields_a_ready_but_unknowing_corpus() {
        let manager = manager();
        let report = manager.ingest_text("").await.expect("ingest should work");
        assert_eq!(report.chunk_count, 0);
        assert!(manager.is_ready());

        let answer = manager
            .query("What color is the sky?")
            .await
            .expect("query should work");
        assert!(answer.sources.is_empty());
        assert_eq!(answer.text, "I don't know");
    }

    #[tokio::test]
    async fn ingest_path_rejects_non_pdf_extensions() {
        let manager = manager();
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not a pdf").expect("file should write");

        let result = manager.ingest_path(&path).await;
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn ingest_path_surfaces_extraction_failures() {
        let manager = manager();
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%broken").expect("file should write");

        let result = manager.ingest_path(&path).await;
        assert!(matches!(result, Err(IngestError::ExtractionFailed(_))));
        assert!(!manager.is_ready());
    }

    #[test]
    fn checksums_are_reproducible() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }
}
