use anyhow::Result;
use reqwest::blocking::Client;

use super::DocumentSource;
use crate::document::{Document, SourceKind};
use crate::html::extract_page;
use crate::mirror::PageCache;

/// A single remote page, fetched through the page cache.
pub struct WebPageSource {
    client: Client,
    cache: PageCache,
    url: String,
}

impl WebPageSource {
    /// Source for `url`, caching the download in `cache`.
    pub fn new(client: Client, cache: PageCache, url: impl Into<String>) -> Self {
        Self {
            client,
            cache,
            url: url.into(),
        }
    }
}

impl DocumentSource for WebPageSource {
    fn name(&self) -> &str {
        "web"
    }

    fn load(&self) -> Result<Vec<Document>> {
        let body = self.cache.fetch(&self.client, &self.url)?;
        Ok(page_document(&self.url, &body).into_iter().collect())
    }
}

fn page_document(url: &str, body: &str) -> Option<Document> {
    let page = extract_page(body);
    if page.text.is_empty() {
        log::warn!("no readable text in {url}");
        return None;
    }
    Some(Document::new(
        page.text,
        SourceKind::WebPage,
        url,
        page.language,
        page.title,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::http_client;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn loads_from_cached_copy() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::new(dir.path());
        let url = "https://linuxbook.ir/all.html";
        cache
            .put(
                url,
                r#"<html lang="fa"><head><title>لینوکس و زندگی</title></head><body><p>فصل اول</p></body></html>"#,
            )
            .unwrap();

        let source = WebPageSource::new(http_client(Duration::from_secs(1)).unwrap(), cache, url);
        let docs = source.load().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "فصل اول");
        assert_eq!(docs[0].metadata.locator, url);
        assert_eq!(docs[0].metadata.language.as_deref(), Some("fa"));
        assert_eq!(docs[0].metadata.title.as_deref(), Some("لینوکس و زندگی"));
    }

    #[test]
    fn empty_page_yields_no_document() {
        assert!(page_document("https://example.com", "<html><body></body></html>").is_none());
    }
}
