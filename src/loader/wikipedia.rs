use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use super::DocumentSource;
use crate::document::{Document, SourceKind};
use crate::html::extract_wiki_article;

/// Encyclopedia articles resolved by title search, one document per title.
pub struct WikipediaSource {
    client: Client,
    lang: String,
    titles: Vec<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct ParseResponse {
    parse: Option<ParsedPage>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ParsedPage {
    title: String,
    text: String,
}

#[derive(Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

impl WikipediaSource {
    /// Source for `titles` in the `lang` edition.
    pub fn new(client: Client, lang: impl Into<String>, titles: Vec<String>) -> Self {
        Self {
            client,
            lang: lang.into(),
            titles,
        }
    }

    fn api_url(&self) -> String {
        format!("https://{}.wikipedia.org/w/api.php", self.lang)
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, params: &[(&str, &str)]) -> Result<T> {
        let resp = self
            .client
            .get(self.api_url())
            .query(params)
            .send()
            .context("Wikipedia request failed to send")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            bail!("Wikipedia request failed ({}): {}", status, body);
        }
        resp.json().context("failed to parse Wikipedia response")
    }

    fn best_match(&self, query: &str) -> Result<String> {
        let resp: SearchResponse = self.get_json(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", "1"),
            ("format", "json"),
        ])?;
        first_title(resp).ok_or_else(|| anyhow!("no Wikipedia article matches '{query}'"))
    }

    fn article(&self, query: &str) -> Result<Document> {
        let title = self.best_match(query)?;
        let resp: ParseResponse = self.get_json(&[
            ("action", "parse"),
            ("page", title.as_str()),
            ("prop", "text"),
            ("redirects", "1"),
            ("formatversion", "2"),
            ("format", "json"),
        ])?;
        let page = parsed_page(resp)?;
        let text = extract_wiki_article(&page.text);
        if text.is_empty() {
            bail!("Wikipedia article '{}' has no readable text", page.title);
        }
        let url = article_url(&self.lang, &page.title)?;
        Ok(Document::new(
            text,
            SourceKind::Wikipedia,
            url,
            Some(self.lang.clone()),
            Some(page.title),
        ))
    }
}

impl DocumentSource for WikipediaSource {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn load(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        let mut last_error = None;
        for title in &self.titles {
            match self.article(title) {
                Ok(doc) => {
                    log::info!("loaded Wikipedia article for '{title}'");
                    docs.push(doc);
                }
                Err(err) => {
                    log::warn!("skipping Wikipedia title '{title}': {err:#}");
                    last_error = Some(err);
                }
            }
        }
        match last_error {
            Some(err) if docs.is_empty() => Err(err.context("every Wikipedia title failed")),
            _ => Ok(docs),
        }
    }
}

fn first_title(resp: SearchResponse) -> Option<String> {
    resp.query.search.into_iter().next().map(|hit| hit.title)
}

fn parsed_page(resp: ParseResponse) -> Result<ParsedPage> {
    if let Some(err) = resp.error {
        bail!("Wikipedia API error {}: {}", err.code, err.info);
    }
    resp.parse
        .ok_or_else(|| anyhow!("Wikipedia parse response had no page"))
}

fn article_url(lang: &str, title: &str) -> Result<String> {
    let mut url = Url::parse(&format!("https://{lang}.wikipedia.org/wiki/"))
        .with_context(|| format!("invalid Wikipedia language '{lang}'"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Wikipedia URL cannot be a base"))?
        .pop_if_empty()
        .push(&title.replace(' ', "_"));
    Ok(url.to_string())
}
