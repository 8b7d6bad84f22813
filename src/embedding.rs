//! Embedding providers.
//!
//! Concrete [`Embedder`] implementations selected by `[embedding].provider`:
//! - **[`DisabledEmbedder`]**: every call fails; ingestion skips all chunks
//!   and turns run ungrounded.
//! - **[`OpenAiEmbedder`]**: `POST {url}/embeddings`, key from `OPENAI_API_KEY`.
//! - **[`OllamaEmbedder`]**: `POST {url}/api/embed` on a local Ollama.
//!
//! Provider errors surface as [`RetrievalError::Embedding`]. Retry and
//! backoff live in [`crate::http`].

use anyhow::{bail, Result};
use async_trait::async_trait;

use receptionist_kb_core::embedding::Embedder;
use receptionist_kb_core::error::RetrievalResult;
use receptionist_kb_core::RetrievalError;

use crate::config::EmbeddingConfig;
use crate::http::{self, JsonPost};

const OPENAI_URL: &str = "https://api.openai.com/v1";
const OLLAMA_URL: &str = "http://localhost:11434";

/// Build the embedder named by `config.provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> RetrievalResult<Vec<f32>> {
        Err(RetrievalError::Embedding(
            "embedding provider is disabled".to_string(),
        ))
    }
}

fn required(config: &EmbeddingConfig) -> Result<(String, usize)> {
    let model = config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("embedding.model required for {}", config.provider))?;
    let dims = config
        .dims
        .ok_or_else(|| anyhow::anyhow!("embedding.dims required for {}", config.provider))?;
    Ok((model, dims))
}

fn check_dims(vector: Vec<f32>, dims: usize) -> RetrievalResult<Vec<f32>> {
    if vector.len() != dims {
        return Err(RetrievalError::Embedding(format!(
            "provider returned {} dimensions, configured {}",
            vector.len(),
            dims
        )));
    }
    Ok(vector)
}

// ============ OpenAI ============

pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    /// # Errors
    ///
    /// Fails if `model` or `dims` is unset, or `OPENAI_API_KEY` is not in
    /// the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = required(config)?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            model,
            dims,
            url: config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string()),
            api_key,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> RetrievalResult<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = http::post_json(
            &self.client,
            JsonPost {
                label: "OpenAI",
                url: format!("{}/embeddings", self.url.trim_end_matches('/')),
                bearer: Some(&self.api_key),
                body: &body,
                max_retries: self.max_retries,
            },
        )
        .await
        .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let vector = parse_openai_response(&json)
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        check_dims(vector, self.dims)
    }
}

/// Extract `data[0].embedding` from an embeddings response.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data[0].embedding"))?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

// ============ Ollama ============

pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = required(config)?;
        Ok(Self {
            model,
            dims,
            url: config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> RetrievalResult<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        let json = http::post_json(
            &self.client,
            JsonPost {
                label: "Ollama",
                url: format!("{}/api/embed", self.url.trim_end_matches('/')),
                bearer: None,
                body: &body,
                max_retries: self.max_retries,
            },
        )
        .await
        .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let vector = parse_ollama_response(&json)
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        check_dims(vector, self.dims)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings[0]"))?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}
