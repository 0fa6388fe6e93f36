//! Embeddings from a model served locally by an Ollama-compatible runtime.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::Embedder;

/// Blocking client for `POST /api/embed`; needs no credential.
#[derive(Clone)]
pub struct LocalEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    model_id: String,
}

impl LocalEmbedder {
    /// Builds a client for the runtime at `base_url` serving `model`.
    pub fn new(base_url: String, model: String, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "local embedding endpoint must be an http(s) URL"
        );
        anyhow::ensure!(!model.trim().is_empty(), "missing local model name");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build local embedding HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", base_url.trim_end_matches('/')),
            model_id: format!("local/{model}"),
            model,
        })
    }

    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbedRequest {
            model: &self.model,
            input: inputs,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .with_context(|| format!("failed to reach local embedding runtime at {}", self.endpoint))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("local embedding request failed ({}): {}", status, body);
        }
        let parsed: EmbedResponse = resp
            .json()
            .context("failed to parse local embedding response")?;
        anyhow::ensure!(
            parsed.embeddings.len() == inputs.len(),
            "local runtime returned {} embeddings for {} inputs",
            parsed.embeddings.len(),
            inputs.len()
        );
        Ok(parsed.embeddings)
    }
}

impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .context("local runtime returned no embedding")
    }

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
