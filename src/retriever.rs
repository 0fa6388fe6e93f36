//! Top-k retrieval over a collection, with optional MMR diversification.

use std::cell::RefCell;
use std::num::NonZeroUsize;

use anyhow::Result;
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::document::Chunk;
use crate::embedder::Embedder;
use crate::vector_store::{cosine_similarity, Collection, SearchHit};

/// How candidates are chosen from the collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchType {
    /// The `k` nearest chunks.
    Similarity,
    /// Maximal marginal relevance over the `fetch_k` nearest chunks.
    Mmr {
        /// Candidates fetched before reranking.
        fetch_k: usize,
        /// 1.0 ranks purely by relevance, 0.0 purely by diversity.
        lambda: f32,
    },
}

/// Retriever settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Chunks returned per question.
    pub k: usize,
    /// Candidate selection strategy.
    pub search: SearchType,
    /// Query embeddings kept in memory; 0 disables the cache.
    pub cache_size: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            k: 10,
            search: SearchType::Mmr {
                fetch_k: 50,
                lambda: 0.5,
            },
            cache_size: 256,
        }
    }
}

/// A chunk picked for a question.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// The stored chunk.
    pub chunk: Chunk,
    /// Cosine distance to the question embedding.
    pub distance: f32,
}

/// Embeds questions and looks them up in a collection.
pub struct Retriever {
    collection: Collection,
    embedder: Box<dyn Embedder>,
    config: RetrieverConfig,
    cache: Option<RefCell<LruCache<String, Vec<f32>>>>,
}

impl Retriever {
    /// Binds `collection` to the embedder it was built with.
    pub fn new(collection: Collection, embedder: Box<dyn Embedder>, config: RetrieverConfig) -> Self {
        let cache =
            NonZeroUsize::new(config.cache_size).map(|cap| RefCell::new(LruCache::new(cap)));
        Self {
            collection,
            embedder,
            config,
            cache,
        }
    }

    /// Retriever settings.
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Underlying collection.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// The `k` chunks most relevant to `question`, best first.
    pub fn fetch(&self, question: &str) -> Result<Vec<RetrievedChunk>> {
        let query = self.query_embedding(question)?;
        let k = self.config.k;
        let hits = match self.config.search {
            SearchType::Similarity => self.collection.search(&query, k)?,
            SearchType::Mmr { fetch_k, lambda } => {
                let candidates = self.collection.search(&query, fetch_k.max(k))?;
                mmr_select(&query, candidates, k, lambda)
            }
        };
        log::debug!("retrieved {} chunks for question", hits.len());
        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                chunk: hit.chunk,
                distance: hit.distance,
            })
            .collect())
    }

    fn query_embedding(&self, question: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.borrow_mut().get(question).cloned())
        {
            return Ok(hit);
        }
        let embedding = self.embedder.embed_query(question)?;
        if let Some(cache) = &self.cache {
            cache
                .borrow_mut()
                .put(question.to_string(), embedding.clone());
        }
        Ok(embedding)
    }
}

/// Greedy MMR: repeatedly take the candidate maximising
/// `lambda * sim(query, c) - (1 - lambda) * max sim(c, selected)`.
fn mmr_select(query: &[f32], candidates: Vec<SearchHit>, k: usize, lambda: f32) -> Vec<SearchHit> {
    let lambda = lambda.clamp(0.0, 1.0);
    let mut remaining = candidates;
    let mut selected: Vec<SearchHit> = Vec::with_capacity(k.min(remaining.len()));
    while selected.len() < k && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (idx, candidate) in remaining.iter().enumerate() {
            let relevance = cosine_similarity(query, &candidate.embedding);
            let redundancy = selected
                .iter()
                .map(|chosen| cosine_similarity(&candidate.embedding, &chosen.embedding))
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if selected.is_empty() { 0.0 } else { redundancy };
            let score = lambda * relevance - (1.0 - lambda) * redundancy;
            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }
        selected.push(remaining.remove(best_idx));
    }
    selected
}
