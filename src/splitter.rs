//! Overlapping window splitter turning documents into embeddable chunks.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use text_splitter::{ChunkConfig, ChunkSizer, TextSplitter};

use crate::document::{Chunk, Document};

/// Unit in which `chunk_size` and `overlap` are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SizeUnit {
    /// Unicode scalar values.
    Characters,
    /// Whitespace-separated words.
    Words,
}

/// Window placement strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Fixed windows with an exact overlap between neighbours.
    Fixed,
    /// Boundary-aware windows (paragraph, sentence, word) with approximate overlap.
    Semantic,
}

/// Splitter tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum chunk length in `unit`s.
    pub chunk_size: usize,
    /// Units shared by consecutive chunks of one document.
    pub overlap: usize,
    /// Length unit.
    pub unit: SizeUnit,
    /// Window placement strategy.
    pub mode: SplitMode,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 700,
            overlap: 100,
            unit: SizeUnit::Characters,
            mode: SplitMode::Fixed,
        }
    }
}

/// Stateless document splitter.
#[derive(Debug, Clone)]
pub struct Splitter {
    config: SplitterConfig,
}

impl Splitter {
    /// Builds a splitter, rejecting windows that could never advance.
    pub fn new(config: SplitterConfig) -> Result<Self> {
        anyhow::ensure!(config.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            config.overlap < config.chunk_size,
            "overlap {} must be smaller than chunk_size {}",
            config.overlap,
            config.chunk_size
        );
        Ok(Self { config })
    }

    /// Returns the underlying config reference.
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Splits every document, preserving document order and chunk order within each.
    pub fn split(&self, docs: &[Document]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for doc in docs {
            let windows = self
                .windows(&doc.text)
                .with_context(|| format!("failed to split {}", doc.metadata.locator))?;
            chunks.extend(
                windows
                    .into_iter()
                    .enumerate()
                    .map(|(chunk_index, (start, text))| Chunk {
                        text,
                        metadata: doc.metadata.clone(),
                        chunk_index,
                        start,
                    }),
            );
        }
        log::info!(
            "split {} documents into {} chunks (chunk_size={}, overlap={}, unit={:?}, mode={:?})",
            docs.len(),
            chunks.len(),
            self.config.chunk_size,
            self.config.overlap,
            self.config.unit,
            self.config.mode
        );
        Ok(chunks)
    }

    /// Splits a small subset and logs the outcome, as a cheap sanity check.
    pub fn preview(&self, docs: &[Document], max_docs: usize) -> Result<usize> {
        let subset = &docs[..docs.len().min(max_docs)];
        if subset.is_empty() {
            log::info!("no documents provided for split preview");
            return Ok(0);
        }
        let chunks = self.split(subset)?;
        log::info!(
            "preview split: {} documents -> {} chunks",
            subset.len(),
            chunks.len()
        );
        Ok(chunks.len())
    }

    fn windows(&self, text: &str) -> Result<Vec<(usize, String)>> {
        match (self.config.mode, self.config.unit) {
            (SplitMode::Fixed, SizeUnit::Characters) => Ok(self.fixed_char_windows(text)),
            (SplitMode::Fixed, SizeUnit::Words) => Ok(self.fixed_word_windows(text)),
            (SplitMode::Semantic, unit) => self.semantic_windows(text, unit),
        }
    }

    fn fixed_char_windows(&self, text: &str) -> Vec<(usize, String)> {
        let mut offsets: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
        let total = offsets.len();
        offsets.push(text.len());
        window_ranges(total, self.config.chunk_size, self.config.overlap)
            .into_iter()
            .map(|(start, end)| (start, text[offsets[start]..offsets[end]].to_string()))
            .collect()
    }

    fn fixed_word_windows(&self, text: &str) -> Vec<(usize, String)> {
        let words: Vec<&str> = text.split_whitespace().collect();
        window_ranges(words.len(), self.config.chunk_size, self.config.overlap)
            .into_iter()
            .map(|(start, end)| (start, words[start..end].join(" ")))
            .collect()
    }

    fn semantic_windows(&self, text: &str, unit: SizeUnit) -> Result<Vec<(usize, String)>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let to_units = |byte_offset: usize| match unit {
            SizeUnit::Characters => text[..byte_offset].chars().count(),
            SizeUnit::Words => text[..byte_offset].split_whitespace().count(),
        };
        let windows = match unit {
            SizeUnit::Characters => {
                let config = ChunkConfig::new(self.config.chunk_size)
                    .with_overlap(self.config.overlap)
                    .context("invalid semantic splitter overlap")?
                    .with_trim(true);
                TextSplitter::new(config)
                    .chunk_indices(text)
                    .map(|(offset, chunk)| (to_units(offset), chunk.to_string()))
                    .collect()
            }
            SizeUnit::Words => {
                let config = ChunkConfig::new(self.config.chunk_size)
                    .with_sizer(WordSizer)
                    .with_overlap(self.config.overlap)
                    .context("invalid semantic splitter overlap")?
                    .with_trim(true);
                TextSplitter::new(config)
                    .chunk_indices(text)
                    .map(|(offset, chunk)| (to_units(offset), chunk.to_string()))
                    .collect()
            }
        };
        Ok(windows)
    }
}

/// Sizes chunks by whitespace-separated word count.
struct WordSizer;

impl ChunkSizer for WordSizer {
    fn size(&self, chunk: &str) -> usize {
        chunk.split_whitespace().count()
    }
}

/// Half-open unit ranges covering `total` units with windows of `size`
/// that start every `size - overlap` units. The final window ends at `total`.
fn window_ranges(total: usize, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    if total == 0 {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);
    let mut ranges = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + size).min(total);
        ranges.push((start, end));
        if end == total {
            break;
        }
        start += step;
    }
    ranges
}
