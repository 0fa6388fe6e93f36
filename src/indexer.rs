//! Batched embedding of chunks into a persisted collection.

use std::thread;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::document::Chunk;
use crate::embedder::Embedder;
use crate::vector_store::{Collection, StoreConfig};

/// Builds and loads the configured collection.
#[derive(Debug, Clone)]
pub struct VectorIndexer {
    store: StoreConfig,
    batch_size: usize,
    pause: Duration,
    rebuild: bool,
}

impl VectorIndexer {
    /// Indexer writing to `store`, embedding `batch_size` chunks per request
    /// and sleeping `pause` between requests.
    pub fn new(store: StoreConfig, batch_size: usize, pause: Duration) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            pause,
            rebuild: false,
        }
    }

    /// Drop the existing collection, including its recorded embedding model,
    /// before adding new records.
    pub fn with_rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }

    /// Store location.
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Embeds `chunks` and appends them to the collection, creating it when
    /// needed. Each batch is committed as soon as it is embedded; an upstream
    /// failure stops the build and is returned unchanged.
    pub fn build(&self, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Collection> {
        ensure!(!chunks.is_empty(), "no chunks to index");
        let total_batches = chunks.len().div_ceil(self.batch_size);
        log::info!(
            "adding {} chunks to '{}' (batch_size={})",
            chunks.len(),
            self.store.collection_name,
            self.batch_size
        );

        let mut collection: Option<Collection> = None;
        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            if batch_no > 0 && !self.pause.is_zero() {
                thread::sleep(self.pause);
            }
            let texts: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
            let vectors = embedder.embed_documents(&texts)?;

            if collection.is_none() {
                let dimensions = vectors
                    .first()
                    .map(Vec::len)
                    .context("embedder returned no vectors")?;
                let open = if self.rebuild {
                    Collection::recreate
                } else {
                    Collection::create_or_open
                };
                collection = Some(open(
                    &self.store.collection_dir,
                    &self.store.collection_name,
                    embedder.model_id(),
                    dimensions,
                )?);
            }
            let target = collection.as_mut().context("collection was not opened")?;
            target.add(batch, &vectors)?;
            log::info!("embedded batch {}/{}", batch_no + 1, total_batches);
        }

        let collection = collection.context("no batches were indexed")?;
        log::info!("collection size: {}", collection.count()?);
        Ok(collection)
    }

    /// Opens the existing collection without recomputing anything. Fails when
    /// it was never built or was built with a different model.
    pub fn load(&self, embedder: &dyn Embedder) -> Result<Collection> {
        let collection = Collection::open_existing(
            &self.store.collection_dir,
            &self.store.collection_name,
            embedder.model_id(),
        )?;
        log::info!(
            "loaded collection '{}' from {} (size={})",
            collection.name(),
            collection.db_path().display(),
            collection.count()?
        );
        Ok(collection)
    }
}
