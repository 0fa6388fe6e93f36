//! Document sources feeding the build pipeline.
//!
//! Each source turns one kind of input (a local PDF, a remote page, a set of
//! encyclopedia articles, a mirrored HTML tree) into [`Document`]s. Sources
//! are run through [`load_sources`], which keeps going when one of them fails.

mod html_dir;
mod pdf;
mod web;
mod wikipedia;

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::document::Document;

pub use html_dir::HtmlDirectorySource;
pub use pdf::PdfSource;
pub use web::WebPageSource;
pub use wikipedia::WikipediaSource;

/// Locations of every input the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Local PDF book.
    pub pdf_path: PathBuf,
    /// Directory holding the mirrored HTML pages.
    pub html_dir: PathBuf,
    /// Web book fetched as a single page.
    pub web_url: String,
    /// Directory for cached downloads.
    pub page_cache_dir: PathBuf,
    /// Encyclopedia article titles, searched one by one.
    pub wikipedia_titles: Vec<String>,
    /// Corpus language; also selects the encyclopedia edition.
    pub wikipedia_lang: String,
    /// Site whose internal pages are mirrored into `html_dir`.
    pub mirror_base_url: String,
    /// HTTP timeout for fetching sources, in seconds.
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            pdf_path: PathBuf::from("data/justforfun_persian.pdf"),
            html_dir: PathBuf::from("data/html"),
            web_url: "https://linuxbook.ir/all.html".to_string(),
            page_cache_dir: PathBuf::from("data/cache"),
            wikipedia_titles: [
                "ریچارد استالمن",
                "لینوس توروالدز",
                "لینوکس",
                "پروژه گنو",
                "نرم‌افزار آزاد",
                "بنیاد نرم‌افزار آزاد",
            ]
            .iter()
            .map(|title| title.to_string())
            .collect(),
            wikipedia_lang: "fa".to_string(),
            mirror_base_url: "https://stallman.org".to_string(),
            timeout_secs: 60,
        }
    }
}

/// A producer of documents.
pub trait DocumentSource {
    /// Short label used in logs and failure reports.
    fn name(&self) -> &str;

    /// Loads every document this source provides.
    fn load(&self) -> Result<Vec<Document>>;
}

/// A source that failed as a whole.
#[derive(Debug)]
pub struct SourceFailure {
    /// Name of the failing source.
    pub source: String,
    /// The error it returned.
    pub error: anyhow::Error,
}

/// Documents from every source that succeeded, plus the failures.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Loaded documents, in source order.
    pub documents: Vec<Document>,
    /// Sources that returned an error.
    pub failures: Vec<SourceFailure>,
}

impl LoadReport {
    /// True when no source produced a document.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Runs every source in order. A failing source is logged and recorded but
/// does not stop the remaining ones.
pub fn load_sources(sources: &[&dyn DocumentSource]) -> LoadReport {
    let mut report = LoadReport::default();
    for source in sources {
        match source.load() {
            Ok(docs) => {
                log::info!("loaded {} document(s) from {}", docs.len(), source.name());
                report.documents.extend(docs);
            }
            Err(error) => {
                log::warn!("skipping source {}: {error:#}", source.name());
                report.failures.push(SourceFailure {
                    source: source.name().to_string(),
                    error,
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceKind;
    use anyhow::bail;
    use pretty_assertions::assert_eq;

    struct Fixed(&'static str, usize);

    impl DocumentSource for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn load(&self) -> Result<Vec<Document>> {
            Ok((0..self.1)
                .map(|i| {
                    Document::new(
                        format!("{} {i}", self.0),
                        SourceKind::WebPage,
                        format!("{}/{i}", self.0),
                        None,
                        None,
                    )
                })
                .collect())
        }
    }

    struct Broken;

    impl DocumentSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn load(&self) -> Result<Vec<Document>> {
            bail!("connection refused")
        }
    }

    #[test]
    fn failure_in_one_source_keeps_the_rest() {
        let report = load_sources(&[&Fixed("a", 2), &Broken, &Fixed("b", 1), &Fixed("c", 1)]);
        let texts: Vec<&str> = report.documents.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["a 0", "a 1", "b 0", "c 0"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "broken");
        assert!(report.failures[0].error.to_string().contains("refused"));
    }

    #[test]
    fn defaults_point_at_bundled_data() {
        let config = SourcesConfig::default();
        assert_eq!(config.wikipedia_titles.len(), 6);
        assert_eq!(config.wikipedia_lang, "fa");
        assert_eq!(config.pdf_path, PathBuf::from("data/justforfun_persian.pdf"));
    }
}
