use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};
use walkdir::WalkDir;

use super::DocumentSource;
use crate::document::{Document, SourceKind};
use crate::html::extract_page;

/// Every `*.html` file under a mirrored directory tree.
#[derive(Debug, Clone)]
pub struct HtmlDirectorySource {
    dir: PathBuf,
}

impl HtmlDirectorySource {
    /// Source walking `dir` recursively.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn html_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::warn!("skipping unreadable entry under {}: {err}", self.dir.display());
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_html(path))
            .collect();
        files.sort();
        files
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html"))
        .unwrap_or(false)
}

impl DocumentSource for HtmlDirectorySource {
    fn name(&self) -> &str {
        "html"
    }

    fn load(&self) -> Result<Vec<Document>> {
        ensure!(
            self.dir.is_dir(),
            "HTML directory not found at {}",
            self.dir.display()
        );
        let mut docs = Vec::new();
        for path in self.html_files() {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::warn!("skipping {}: {err}", path.display());
                    continue;
                }
            };
            let page = extract_page(&String::from_utf8_lossy(&bytes));
            if page.text.is_empty() {
                log::debug!("no readable text in {}", path.display());
                continue;
            }
            docs.push(Document::new(
                page.text,
                SourceKind::HtmlMirror,
                path.display().to_string(),
                page.language,
                page.title,
            ));
        }
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn loads_html_files_recursively_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("archives")).unwrap();
        fs::write(dir.path().join("b.html"), "<p>second</p>").unwrap();
        fs::write(dir.path().join("a.html"), "<p>first</p>").unwrap();
        fs::write(dir.path().join("archives/c.HTML"), "<p>third</p>").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("empty.html"), "<html></html>").unwrap();

        let docs = HtmlDirectorySource::new(dir.path()).load().unwrap();
        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "third", "second"]);
        assert!(docs
            .iter()
            .all(|d| d.metadata.source == SourceKind::HtmlMirror));
    }

    #[test]
    fn missing_directory_fails() {
        let err = HtmlDirectorySource::new("/nonexistent/html").load().unwrap_err();
        assert!(err.to_string().contains("HTML directory not found"));
    }
}
