//! Build phase: load, normalize, split, and index every source.

use std::time::Duration;

use anyhow::{bail, Result};

use crate::config::PipelineConfig;
use crate::document::Document;
use crate::embedder::Embedder;
use crate::indexer::VectorIndexer;
use crate::loader::{
    load_sources, HtmlDirectorySource, LoadReport, PdfSource, SourcesConfig,
    WebPageSource, WikipediaSource,
};
use crate::mirror::{http_client, PageCache};
use crate::normalizer::normalize_documents_of;
use crate::splitter::Splitter;

/// What a build run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Documents loaded across all sources.
    pub documents: usize,
    /// Documents rewritten by the normalizer.
    pub normalized: usize,
    /// Chunks embedded in this run.
    pub chunks: usize,
    /// Records in the collection afterwards.
    pub collection_size: usize,
    /// Names of sources that failed to load.
    pub failed_sources: Vec<String>,
}

/// Loads the four configured sources, isolating failures per source.
pub fn load_all(sources: &SourcesConfig) -> Result<LoadReport> {
    let client = http_client(Duration::from_secs(sources.timeout_secs))?;
    let pdf = PdfSource::new(&sources.pdf_path, Some(sources.wikipedia_lang.clone()));
    let web = WebPageSource::new(
        client.clone(),
        PageCache::new(&sources.page_cache_dir),
        &sources.web_url,
    );
    let wiki = WikipediaSource::new(
        client,
        &sources.wikipedia_lang,
        sources.wikipedia_titles.clone(),
    );
    let html = HtmlDirectorySource::new(&sources.html_dir);
    Ok(load_sources(&[&pdf, &wiki, &html, &web]))
}

/// Runs the whole build phase against the configured collection.
pub fn build_index(config: &PipelineConfig, embedder: &dyn Embedder) -> Result<BuildSummary> {
    let report = load_all(&config.sources)?;
    build_from_report(config, embedder, report)
}

/// Normalizes, splits, and indexes already-loaded documents. Fails only when
/// no source produced any document.
pub fn build_from_report(
    config: &PipelineConfig,
    embedder: &dyn Embedder,
    report: LoadReport,
) -> Result<BuildSummary> {
    let failed_sources: Vec<String> = report.failures.iter().map(|f| f.source.clone()).collect();
    let mut documents: Vec<Document> = report.documents;
    if documents.is_empty() {
        match report.failures.into_iter().next() {
            Some(first) => {
                return Err(first
                    .error
                    .context(format!("no documents loaded; sources failed: {}", failed_sources.join(", "))))
            }
            None => bail!("no documents loaded"),
        }
    }

    let normalized = normalize_documents_of(&mut documents, &config.normalize_sources);
    log::info!("normalized {normalized} document(s)");

    let splitter = Splitter::new(config.splitter)?;
    splitter.preview(&documents, 3)?;
    let chunks = splitter.split(&documents)?;

    let indexer = VectorIndexer::new(
        config.store.clone(),
        config.embedding.batch_size,
        config.embedding.pause,
    )
    .with_rebuild(config.rebuild_index);
    let collection = indexer.build(&chunks, embedder)?;

    Ok(BuildSummary {
        documents: documents.len(),
        normalized,
        chunks: chunks.len(),
        collection_size: collection.count()?,
        failed_sources,
    })
}
