use crate::error::SynthesisError;
use crate::models::ScoredChunk;
use crate::traits::ChatModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_CHAT_MODEL: &str = "claude-haiku-4-5";
pub const DEFAULT_MAX_ANSWER_TOKENS: u32 = 500;
pub const DEFAULT_MAX_CONTEXT_SEGMENTS: usize = 10;
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(60);

const ANTHROPIC_VERSION: &str = "2023-06-01";

const ANSWER_INSTRUCTION: &str = "Answer concisely the following question based on the context \
provided. If the answer is not in the context, say \"I don't know\".";

#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    pub endpoint: Url,
    pub model: String,
    pub api_key: Option<String>,
    /// Declared maximum length of the generated answer, in tokens.
    pub max_answer_tokens: u32,
    /// How many retrieved chunks are allowed into the prompt; together with
    /// the chunk size this bounds the context window.
    pub max_context_segments: usize,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl ContentBlock {
    fn text(text: String) -> Self {
        Self {
            kind: "text".to_string(),
            text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    content: Vec<ContentBlock>,
}

/// One user message: the instruction and question first, then each retrieved
/// chunk as its own context segment, in retrieval order.
fn grounded_content(
    question: &str,
    context: &[ScoredChunk],
    max_context_segments: usize,
) -> Vec<ContentBlock> {
    let mut blocks = Vec::with_capacity(1 + context.len().min(max_context_segments));
    blocks.push(ContentBlock::text(format!(
        "{ANSWER_INSTRUCTION}\n\nQuestion: {question}"
    )));

    for hit in context.iter().take(max_context_segments) {
        blocks.push(ContentBlock::text(hit.chunk.text.clone()));
    }

    blocks
}

/// The answer is the first non-empty text segment of the reply.
fn extract_answer(response: ChatResponse) -> Result<String, SynthesisError> {
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text" && !block.text.trim().is_empty())
        .map(|block| block.text)
        .ok_or(SynthesisError::EmptyReply)
}

/// Client for the Anthropic Messages API.
pub struct AnthropicChatModel {
    config: SynthesizerConfig,
    client: Client,
}

impl AnthropicChatModel {
    pub fn new(config: SynthesizerConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ChatModel for AnthropicChatModel {
    async fn answer(
        &self,
        question: &str,
        context: &[ScoredChunk],
    ) -> Result<String, SynthesisError> {
        tracing::debug!(
            context = context.len(),
            model = %self.config.model,
            "synthesizing answer"
        );

        let body = ChatRequest {
            model: &self.config.model,
            max_tokens: self.config.max_answer_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: grounded_content(question, context, self.config.max_context_segments),
            }],
        };

        let mut request = self
            .client
            .post(self.config.endpoint.clone())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        if let Some(api_key) = &self.config.api_key {
            request = request.header("x-api-key", api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SynthesisError::Backend {
                status: status.as_u16(),
                details: response.text().await.unwrap_or_default(),
            });
        }

        let payload: ChatResponse = response.json().await?;
        extract_answer(payload)
    }
}
