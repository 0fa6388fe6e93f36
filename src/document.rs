//! Uniform document and chunk records shared by every pipeline stage.

use clap::ValueEnum;
use crc32fast::Hasher as Crc32;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of a loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Page of a local PDF file.
    Pdf,
    /// Remote web page fetched by URL.
    #[value(name = "web_page")]
    WebPage,
    /// Encyclopedia article fetched from the MediaWiki API.
    Wikipedia,
    /// File from the local mirrored HTML tree.
    #[value(name = "html_mirror")]
    HtmlMirror,
}

impl SourceKind {
    /// Stable lowercase label used in logs and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::WebPage => "web_page",
            Self::Wikipedia => "wikipedia",
            Self::HtmlMirror => "html_mirror",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance attached to every document and inherited by its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Loader that produced the document.
    pub source: SourceKind,
    /// File path, URL, or page reference locating the text.
    pub locator: String,
    /// Language code when known (`fa`, `en`, ...).
    pub language: Option<String>,
    /// Human-readable title when the source provides one.
    pub title: Option<String>,
    /// CRC32 of the document text, refreshed whenever the text is rewritten.
    pub checksum: u32,
}

/// Loaded text plus its source metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Full document text.
    pub text: String,
    /// Source metadata.
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Builds a document and stamps the text checksum.
    pub fn new(
        text: String,
        source: SourceKind,
        locator: impl Into<String>,
        language: Option<String>,
        title: Option<String>,
    ) -> Self {
        let checksum = text_checksum(&text);
        Self {
            text,
            metadata: DocumentMetadata {
                source,
                locator: locator.into(),
                language,
                title,
                checksum,
            },
        }
    }

    /// Replaces the text and refreshes the checksum.
    pub fn set_text(&mut self, text: String) {
        self.metadata.checksum = text_checksum(&text);
        self.text = text;
    }

    /// Number of Unicode scalar values in the text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Bounded slice of a document, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text.
    pub text: String,
    /// Metadata copied from the parent document.
    pub metadata: DocumentMetadata,
    /// Position of the chunk within its parent document.
    pub chunk_index: usize,
    /// Offset of the chunk start in the parent text, in splitter units.
    pub start: usize,
}

/// CRC32 of a text body.
pub fn text_checksum(text: &str) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(text.as_bytes());
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_text_refreshes_checksum() {
        let mut doc = Document::new(
            "first".to_string(),
            SourceKind::Pdf,
            "book.pdf#page=1",
            Some("fa".to_string()),
            None,
        );
        let before = doc.metadata.checksum;
        doc.set_text("second".to_string());
        assert_ne!(before, doc.metadata.checksum);
        assert_eq!(doc.metadata.checksum, text_checksum("second"));
    }

    #[test]
    fn source_kind_serializes_snake_case() {
        let json = serde_json::to_string(&SourceKind::HtmlMirror).unwrap();
        assert_eq!(json, "\"html_mirror\"");
    }
}
