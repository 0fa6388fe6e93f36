//! Cohere embed API client.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::Embedder;

/// Texts accepted by one `/v2/embed` call.
const MAX_TEXTS_PER_CALL: usize = 96;

/// Blocking client for Cohere's `/v2/embed`.
///
/// Documents and queries are embedded with different `input_type`s, which
/// the multilingual v3 models need for asymmetric search.
#[derive(Clone)]
pub struct CohereEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    model_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum InputType {
    SearchDocument,
    SearchQuery,
}

impl CohereEmbedder {
    /// Builds a new Cohere embeddings client.
    pub fn new(api_key: String, base_url: String, model: String, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Cohere API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing Cohere model name");
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid Cohere API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Cohere HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/v2/embed", base_url.trim_end_matches('/')),
            model_id: format!("cohere/{model}"),
            model,
        })
    }

    fn embed_batch(&self, texts: &[&str], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbedRequest {
            model: &self.model,
            texts,
            input_type,
            embedding_types: &["float"],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .context("failed to call Cohere embed API")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("Cohere embed request failed ({}): {}", status, body);
        }
        let parsed: EmbedResponse = resp
            .json()
            .context("failed to parse Cohere embed response")?;
        into_vectors(parsed, texts.len())
    }
}

fn into_vectors(parsed: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let vectors = parsed.embeddings.float;
    anyhow::ensure!(
        vectors.len() == expected,
        "Cohere returned {} embeddings for {} inputs",
        vectors.len(),
        expected
    );
    Ok(vectors)
}

impl Embedder for CohereEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text], InputType::SearchDocument)?
            .pop()
            .context("Cohere returned no embedding")
    }

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_TEXTS_PER_CALL) {
            vectors.extend(self.embed_batch(batch, InputType::SearchDocument)?);
        }
        Ok(vectors)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text], InputType::SearchQuery)?
            .pop()
            .context("Cohere returned no embedding")
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [&'a str],
    input_type: InputType,
    embedding_types: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: EmbeddingsByType,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsByType {
    #[serde(default)]
    float: Vec<Vec<f32>>,
}
