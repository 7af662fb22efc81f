//! HTTP clients for OpenAI-compatible provider APIs
//!
//! Both clients work against any OpenAI-compatible server:
//! - `HttpEmbeddingProvider` posts to a `/v1/embeddings` endpoint
//!   (OpenAI, Azure OpenAI, LM Studio, vLLM, text-embeddings-inference)
//! - `LlmRerankProvider` posts a batched relevance-judgment prompt to a
//!   `/v1/chat/completions` endpoint (Groq, OpenAI, any local server)

use super::traits::{EmbeddingProvider, RerankProvider};
use crate::types::{Embedding, RecordId, RerankCandidate};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the HTTP embedding provider
#[derive(Debug, Clone)]
pub struct HttpEmbeddingConfig {
    /// API endpoint (e.g. "https://api.openai.com/v1/embeddings")
    pub endpoint: String,
    /// API key (falls back to the OPENAI_API_KEY env var)
    pub api_key: Option<String>,
    /// Model name (e.g. "text-embedding-3-small")
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpEmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
        }
    }
}

/// Embedding provider backed by an OpenAI-compatible HTTP API
#[derive(Debug)]
pub struct HttpEmbeddingProvider {
    client: Client,
    config: HttpEmbeddingConfig,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// OpenAI error response format
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

fn build_client(api_key: Option<&str>, env_var: &str, timeout_secs: u64) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let api_key = api_key
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok());

    if let Some(key) = &api_key {
        let auth_value = format!("Bearer {}", key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).context("Invalid API key format")?,
        );
    }

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()
        .context("Failed to build HTTP client")
}

/// Map a non-success response to an error, preferring the API's own message
async fn api_error(response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(&text) {
        anyhow!("API error ({}): {}", status, parsed.error.message)
    } else {
        anyhow!("HTTP error ({}): {}", status, text)
    }
}

impl HttpEmbeddingProvider {
    pub fn new(config: HttpEmbeddingConfig) -> Result<Self> {
        info!(
            "Initializing HTTP embedding provider: endpoint={}, model={}",
            config.endpoint, config.model
        );
        let client = build_client(
            config.api_key.as_deref(),
            "OPENAI_API_KEY",
            config.timeout_secs,
        )?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: vec![text],
            // Only sent for models that support requested dimensions
            dimensions: if self.config.model.contains("text-embedding-3") {
                Some(self.config.dimensions)
            } else {
                None
            },
            encoding_format: "float",
        };

        debug!("Sending embedding request to {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .context("Embedding request failed")?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        data.into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow!("No embedding returned"))
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}

/// Configuration for the LLM rerank provider
#[derive(Debug, Clone)]
pub struct LlmRerankConfig {
    /// Chat-completions endpoint
    pub endpoint: String,
    /// API key (falls back to the GROQ_API_KEY env var)
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Sampling temperature; kept low for score consistency
    pub temperature: f32,
    /// Response token budget
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmRerankConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.1,
            max_tokens: 2048,
            timeout_secs: 30,
        }
    }
}

/// Rerank provider backed by an OpenAI-compatible chat-completions API.
///
/// Builds one batched judgment prompt per call and parses the model's
/// JSON reply into per-id scores. Any shape deviation in the reply is an
/// error; the caller decides what a failed rerank means.
pub struct LlmRerankProvider {
    client: Client,
    config: LlmRerankConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Expected reply payload: `{"scores": [{"id": "...", "score": 87}, ...]}`
#[derive(Debug, Deserialize)]
struct RerankReply {
    scores: Vec<RerankScoreEntry>,
}

#[derive(Debug, Deserialize)]
struct RerankScoreEntry {
    id: String,
    score: f32,
}

const RERANK_SYSTEM_PROMPT: &str = "You are a search relevance expert for \
government support programs. Respond with JSON only.";

impl LlmRerankProvider {
    pub fn new(config: LlmRerankConfig) -> Result<Self> {
        info!(
            "Initializing LLM rerank provider: endpoint={}, model={}",
            config.endpoint, config.model
        );
        let client = build_client(
            config.api_key.as_deref(),
            "GROQ_API_KEY",
            config.timeout_secs,
        )?;
        Ok(Self { client, config })
    }

    fn build_prompt(query: &str, candidates: &[RerankCandidate]) -> String {
        let listing = candidates
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                format!(
                    "{}. ID: {} | Title: {} | Organization: {} | Category: {} | Amount: {}",
                    idx + 1,
                    c.id,
                    c.title,
                    c.organization,
                    c.category.as_deref().unwrap_or("uncategorized"),
                    c.support_amount.as_deref().unwrap_or("unspecified"),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "User query: \"{query}\"\n\n\
             Rate how relevant each of the following support programs is to \
             the query. Assign each program a relevance score from 0 to 100.\n\n\
             [Programs]\n{listing}\n\n\
             Scoring criteria:\n\
             1. Semantic similarity between title and query (40 points)\n\
             2. Relevance of organization/category/amount to the query (30 points)\n\
             3. Presence of query keywords (20 points)\n\
             4. Specificity and clarity of the program (10 points)\n\n\
             Respond in JSON:\n\
             {{ \"scores\": [{{ \"id\": \"program id\", \"score\": number }}, ...] }}\n\n\
             The scores array must cover all {count} programs above.",
            query = query,
            listing = listing,
            count = candidates.len(),
        )
    }
}

#[async_trait]
impl RerankProvider for LlmRerankProvider {
    async fn score(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
    ) -> Result<HashMap<RecordId, f32>> {
        if candidates.is_empty() {
            return Ok(HashMap::new());
        }

        let prompt = Self::build_prompt(query, candidates);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: RERANK_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(
            "Sending rerank request for {} candidates to {}",
            candidates.len(),
            self.config.endpoint
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .context("Rerank request failed")?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat response")?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("Empty chat completion"))?;

        let scores = parse_rerank_reply(&text)?;
        if scores.len() < candidates.len() {
            warn!(
                "Rerank reply covered {}/{} candidates",
                scores.len(),
                candidates.len()
            );
        }
        Ok(scores)
    }
}

/// Parse the model's reply into an id -> score map.
///
/// Models often wrap the JSON in prose or code fences, so the first
/// balanced top-level object is extracted before parsing. Scores are
/// clamped into [0, 100].
fn parse_rerank_reply(text: &str) -> Result<HashMap<RecordId, f32>> {
    let json = extract_json_object(text)
        .ok_or_else(|| anyhow!("No JSON object in rerank reply: {}", text))?;
    let reply: RerankReply =
        serde_json::from_str(json).context("Malformed rerank reply payload")?;

    Ok(reply
        .scores
        .into_iter()
        .map(|entry| (entry.id, entry.score.clamp(0.0, 100.0)))
        .collect())
}

/// Extract the first balanced top-level `{...}` from free text
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
