use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_qa_core::{
    Answer, AnthropicChatModel, ChunkingConfig, CorpusManager, EmbedderConfig, HttpEmbedder,
    IngestOptions, SynthesizerConfig, DEFAULT_CHAT_ENDPOINT, DEFAULT_CHAT_MODEL,
    DEFAULT_CHAT_TIMEOUT, DEFAULT_EMBEDDING_ENDPOINT, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_EMBEDDING_TIMEOUT, DEFAULT_MAX_CONTEXT_SEGMENTS,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Embeddings endpoint (OpenAI-compatible)
    #[arg(long, env = "EMBEDDING_API_URL", default_value = DEFAULT_EMBEDDING_ENDPOINT)]
    embedding_url: String,

    /// Embedding model id
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Embeddings API key
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Messages endpoint for answer synthesis
    #[arg(long, env = "ANTHROPIC_API_URL", default_value = DEFAULT_CHAT_ENDPOINT)]
    llm_url: String,

    /// Language model id
    #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
    llm_model: String,

    /// Language model API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Number of chunks retrieved per question
    #[arg(long, default_value = "10")]
    top_k: usize,

    /// Maximum chunk size in characters
    #[arg(long, default_value = "100")]
    chunk_size: usize,

    /// Overlap between adjacent chunks in characters
    #[arg(long, default_value = "0")]
    chunk_overlap: usize,

    /// Declared maximum answer length in tokens
    #[arg(long, default_value = "500")]
    max_answer_tokens: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Load a PDF and answer one question against it.
    Ask {
        /// Path to the PDF document
        #[arg(long)]
        pdf: PathBuf,
        /// The question to answer
        #[arg(long)]
        question: String,
        /// Print the retrieved context segments with their scores
        #[arg(long, default_value_t = false)]
        show_context: bool,
    },
    /// Load a PDF, then answer questions from stdin until EOF.
    /// `:load <path>` swaps in a new document mid-session.
    Chat {
        /// Path to the PDF document
        #[arg(long)]
        pdf: PathBuf,
    },
}

fn print_answer(answer: &Answer, show_context: bool) {
    println!("{}", answer.text);

    if show_context {
        for hit in &answer.sources {
            println!(
                "[context] score={:.4} chunk={}",
                hit.score, hit.chunk.source_order
            );
            println!("  {}", hit.chunk.text.trim_end());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let embedder = HttpEmbedder::new(EmbedderConfig {
        endpoint: cli
            .embedding_url
            .parse()
            .context("invalid embeddings endpoint url")?,
        model: cli.embedding_model.clone(),
        api_key: cli.embedding_api_key.clone(),
        timeout: DEFAULT_EMBEDDING_TIMEOUT,
    })?;

    let chat = AnthropicChatModel::new(SynthesizerConfig {
        endpoint: cli.llm_url.parse().context("invalid messages endpoint url")?,
        model: cli.llm_model.clone(),
        api_key: cli.llm_api_key.clone(),
        max_answer_tokens: cli.max_answer_tokens,
        max_context_segments: DEFAULT_MAX_CONTEXT_SEGMENTS.max(cli.top_k),
        timeout: DEFAULT_CHAT_TIMEOUT,
    })?;

    let options = IngestOptions {
        chunking: ChunkingConfig {
            max_chars: cli.chunk_size,
            overlap_chars: cli.chunk_overlap,
            ..ChunkingConfig::default()
        },
        top_k: cli.top_k,
    };
    let manager = CorpusManager::new(embedder, chat, options);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-qa boot"
    );

    match cli.command {
        Command::Ask {
            pdf,
            question,
            show_context,
        } => {
            let report = manager.ingest_path(&pdf).await?;
            info!(
                corpus_id = %report.corpus_id,
                chunks = report.chunk_count,
                "document ready"
            );

            let answer = manager.query(&question).await?;
            print_answer(&answer, show_context);
        }
        Command::Chat { pdf } => {
            let report = manager.ingest_path(&pdf).await?;
            println!(
                "loaded {} ({} chunks). Ask away; :load <path> swaps the document, ctrl-d exits.",
                pdf.display(),
                report.chunk_count
            );

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "exit" || input == "quit" {
                    break;
                }

                if let Some(path) = input.strip_prefix(":load ") {
                    match manager.ingest_path(path.trim().as_ref()).await {
                        Ok(report) => {
                            println!("loaded {} chunks from {}", report.chunk_count, path.trim());
                        }
                        Err(error) => {
                            warn!(code = error.error_code(), "ingest failed: {error}");
                        }
                    }
                    continue;
                }

                match manager.query(input).await {
                    Ok(answer) => print_answer(&answer, false),
                    Err(error) => {
                        warn!(code = error.error_code(), "query failed: {error}");
                    }
                }
            }
        }
    }

    Ok(())
}
