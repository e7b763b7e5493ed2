use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported media type: {0}")]
    UnsupportedFormat(String),

    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding service error: {0}")]
    Embedding(#[from] EmbeddingServiceError),

    #[error("index build error: {0}")]
    Index(#[from] IndexError),
}

impl IngestError {
    /// Stable machine-readable code for the ingestion boundary.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported-format",
            Self::ExtractionFailed(_) => "extraction-failed",
            Self::Io(_) | Self::Embedding(_) | Self::Index(_) => "internal-error",
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("question is empty")]
    MissingPrompt,

    #[error("no document has been ingested yet")]
    NoActiveCorpus,

    #[error("embedding service error: {0}")]
    Embedding(#[from] EmbeddingServiceError),

    #[error("answer synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

impl QueryError {
    /// Stable machine-readable code for the question boundary.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingPrompt => "missing-prompt",
            Self::NoActiveCorpus => "no-active-corpus",
            Self::Embedding(_) | Self::Synthesis(_) | Self::Index(_) => "internal-error",
        }
    }
}

#[derive(Debug, Error)]
pub enum EmbeddingServiceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding service returned {status}: {details}")]
    Backend { status: u16, details: String },

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("embedding count mismatch: sent {expected} texts, got {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("language model returned {status}: {details}")]
    Backend { status: u16, details: String },

    #[error("model reply contained no answer text")]
    EmptyReply,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("chunk count {chunks} does not match embedding count {embeddings}")]
    CountMismatch { chunks: usize, embeddings: usize },

    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_codes_are_stable() {
        assert_eq!(QueryError::MissingPrompt.error_code(), "missing-prompt");
        assert_eq!(QueryError::NoActiveCorpus.error_code(), "no-active-corpus");
        assert_eq!(
            QueryError::Synthesis(SynthesisError::EmptyReply).error_code(),
            "internal-error"
        );
        assert_eq!(
            IngestError::UnsupportedFormat("text/plain".to_string()).error_code(),
            "unsupported-format"
        );
        assert_eq!(
            IngestError::ExtractionFailed("broken xref".to_string()).error_code(),
            "extraction-failed"
        );
    }
}
