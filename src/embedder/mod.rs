//! Embedding adapters behind a single narrow capability.
//!
//! The indexer and retriever only see [`Embedder`]; which backend produced
//! the vectors is chosen explicitly through [`EmbeddingConfig`].

mod cohere;
mod local;
mod openai;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use cohere::CohereEmbedder;
pub use local::LocalEmbedder;
pub use openai::OpenAiEmbedder;

/// Turns text into fixed-length vectors.
pub trait Embedder {
    /// Identity recorded with a collection, e.g. `cohere/embed-multilingual-v3.0`.
    fn model_id(&self) -> &str;

    /// Embeds one text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds texts that will be stored in a collection.
    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Embeds a search query.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text)
    }
}

/// Available embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// Cohere embed API (multilingual, default).
    Cohere,
    /// OpenAI-compatible `/embeddings` endpoint.
    #[value(name = "openai")]
    OpenAi,
    /// Model served on this machine by an Ollama-compatible runtime.
    Local,
}

impl EmbeddingBackend {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Cohere => "embed-multilingual-v3.0",
            Self::OpenAi => "text-embedding-3-small",
            Self::Local => "bge-m3",
        }
    }

    /// Endpoint base used when none is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Cohere => "https://api.cohere.com",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Local => "http://127.0.0.1:11434",
        }
    }

    /// Environment variable holding the credential, if the backend needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Cohere => Some("COHERE_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Local => None,
        }
    }
}

/// Embedding backend selection and tuning.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Backend to call.
    pub backend: EmbeddingBackend,
    /// Model name; the backend default when `None`.
    pub model: Option<String>,
    /// Endpoint base; the backend default when `None`.
    pub base_url: Option<String>,
    /// Credential for remote backends.
    pub api_key: Option<String>,
    /// Requested output dimensions (OpenAI only).
    pub dimensions: Option<usize>,
    /// Chunks sent per embedding request while indexing.
    pub batch_size: usize,
    /// Pause between indexing batches.
    pub pause: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Cohere,
            model: None,
            base_url: None,
            api_key: None,
            dimensions: None,
            batch_size: 8,
            pause: Duration::from_secs(3),
            timeout: Duration::from_secs(40),
        }
    }
}

impl EmbeddingConfig {
    /// Effective model name.
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }

    fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.backend.default_base_url().to_string())
    }

    fn api_key(&self) -> Result<String> {
        let var = self.backend.api_key_env().unwrap_or("API key");
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .with_context(|| format!("{var} must be set for the {:?} embedding backend", self.backend))
    }

    /// Builds the configured embedder.
    pub fn build(&self) -> Result<Box<dyn Embedder>> {
        let model = self.model_name().to_string();
        let embedder: Box<dyn Embedder> = match self.backend {
            EmbeddingBackend::Cohere => Box::new(CohereEmbedder::new(
                self.api_key()?,
                self.base_url(),
                model,
                self.timeout,
            )?),
            EmbeddingBackend::OpenAi => Box::new(OpenAiEmbedder::new(
                self.api_key()?,
                self.base_url(),
                model,
                self.dimensions,
                self.timeout,
            )?),
            EmbeddingBackend::Local => {
                Box::new(LocalEmbedder::new(self.base_url(), model, self.timeout)?)
            }
        };
        log::info!("using embedding model {}", embedder.model_id());
        Ok(embedder)
    }
}
