use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use anyhow::{anyhow, ensure, Context, Result};

use super::DocumentSource;
use crate::document::{Document, SourceKind};

/// Local PDF book, one document per non-empty page.
#[derive(Debug, Clone)]
pub struct PdfSource {
    path: PathBuf,
    language: Option<String>,
}

impl PdfSource {
    /// Source reading `path`, tagging pages with `language`.
    pub fn new(path: impl Into<PathBuf>, language: Option<String>) -> Self {
        Self {
            path: path.into(),
            language,
        }
    }
}

impl DocumentSource for PdfSource {
    fn name(&self) -> &str {
        "pdf"
    }

    fn load(&self) -> Result<Vec<Document>> {
        ensure!(
            self.path.is_file(),
            "PDF file not found at {}",
            self.path.display()
        );
        let pages = catch_extractor_panic(|| {
            pdf_extract::extract_text_by_pages(&self.path).map_err(anyhow::Error::from)
        })
        .with_context(|| format!("failed to extract text from {}", self.path.display()))?;
        Ok(pages_to_documents(
            &self.path.display().to_string(),
            self.language.as_deref(),
            pages,
        ))
    }
}

/// Runs the extractor, turning a panic on malformed font or encoding tables
/// into an error so the other sources still load.
fn catch_extractor_panic<T>(extract: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(extract)).unwrap_or_else(|payload| {
        Err(anyhow!(
            "PDF extractor panicked: {}",
            panic_message(&*payload)
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

fn pages_to_documents(path: &str, language: Option<&str>, pages: Vec<String>) -> Vec<Document> {
    pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(idx, text)| {
            Document::new(
                text,
                SourceKind::Pdf,
                format!("{path}#page={}", idx + 1),
                language.map(str::to_string),
                None,
            )
        })
        .collect()
}
