//! Local HTML mirroring and a URL-keyed page cache.
//!
//! The web loader fetches pages through [`PageCache`] so repeated builds do
//! not hit the network again, and [`SiteMirror`] downloads a site's internal
//! pages into the directory read by the HTML mirror loader.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::document::text_checksum;

const USER_AGENT: &str = concat!("docqa/", env!("CARGO_PKG_VERSION"));

/// Builds the blocking HTTP client shared by the fetching loaders.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")
}

/// Downloads `url` and returns the body text, failing on non-success status.
pub fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("failed to fetch {url}"))?;
    if !resp.status().is_success() {
        let status = resp.status();
        bail!("fetching {} returned {}", url, status);
    }
    resp.text()
        .with_context(|| format!("failed to read body of {url}"))
}

/// On-disk cache of fetched pages keyed by URL.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    /// Cache rooted at `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds (or would hold) the cached body of `url`.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(cache_key(url))
    }

    /// Returns the cached body when present, without touching the network.
    pub fn get(&self, url: &str) -> Result<Option<String>> {
        let path = self.path_for(url);
        if !path.is_file() {
            return Ok(None);
        }
        let body = fs::read_to_string(&path)
            .with_context(|| format!("failed to read cached page {}", path.display()))?;
        Ok(Some(body))
    }

    /// Stores `body` as the cached copy of `url`.
    pub fn put(&self, url: &str, body: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create cache dir {}", self.dir.display()))?;
        let path = self.path_for(url);
        fs::write(&path, body)
            .with_context(|| format!("failed to write cached page {}", path.display()))?;
        Ok(path)
    }

    /// Returns the cached body, downloading and storing it on a miss.
    pub fn fetch(&self, client: &Client, url: &str) -> Result<String> {
        if let Some(body) = self.get(url)? {
            log::debug!("page cache hit for {url}");
            return Ok(body);
        }
        let body = fetch_text(client, url)?;
        let path = self.put(url, &body)?;
        log::info!("cached {} at {}", url, path.display());
        Ok(body)
    }
}

/// Readable, collision-resistant file name for a URL.
fn cache_key(url: &str) -> String {
    let readable: String = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '.' { ch } else { '_' })
        .take(80)
        .collect();
    format!("{}-{:08x}.html", readable, text_checksum(url))
}

/// Whether `href` points at an HTML page of the mirrored host.
pub fn is_internal_link(href: &str, host: &str) -> bool {
    if href.starts_with('#') || href.starts_with("tel:") || href.starts_with("mailto:") {
        return false;
    }
    let path_part = href.split(['?', '#']).next().unwrap_or(href);
    if !path_part.ends_with(".html") {
        return false;
    }
    // Protocol-relative links carry a host of their own.
    let parsed = match href.strip_prefix("//") {
        Some(rest) => Url::parse(&format!("https://{rest}")),
        None => Url::parse(href),
    };
    match parsed {
        Ok(parsed) => parsed
            .host_str()
            .map(|link_host| link_host == host || link_host.ends_with(&format!(".{host}")))
            .unwrap_or(false),
        // Relative links fail to parse without a base.
        Err(_) => true,
    }
}

/// File name a mirrored page is stored under (`a/b.html` -> `a_b.html`).
pub fn mirror_file_name(url: &Url) -> String {
    let name = url.path().trim_matches('/').replace('/', "_");
    if name.is_empty() {
        "index.html".to_string()
    } else {
        name
    }
}

/// Outcome of a mirroring run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorReport {
    /// Pages written during this run.
    pub saved: Vec<PathBuf>,
    /// Pages already present on disk.
    pub skipped: usize,
    /// Links that could not be downloaded, with the error message.
    pub failed: Vec<(String, String)>,
}

/// Downloads the internal pages linked from a site's front page.
pub struct SiteMirror {
    client: Client,
    dir: PathBuf,
}

impl SiteMirror {
    /// Mirror writing into `dir`.
    pub fn new(client: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }

    /// Absolute URLs of every internal HTML page linked from `base_url`.
    pub fn extract_links(&self, base_url: &str) -> Result<BTreeSet<Url>> {
        let base = Url::parse(base_url).with_context(|| format!("invalid base URL {base_url}"))?;
        let body = fetch_text(&self.client, base.as_str())?;
        let links = links_in(&base, &body);
        log::info!("found {} internal HTML links on {}", links.len(), base);
        Ok(links)
    }

    /// Saves every internal page linked from `base_url`, skipping files that
    /// already exist and continuing past individual failures.
    pub fn mirror(&self, base_url: &str) -> Result<MirrorReport> {
        let links = self.extract_links(base_url)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let mut report = MirrorReport::default();
        for link in links {
            let path = self.dir.join(mirror_file_name(&link));
            if path.exists() {
                report.skipped += 1;
                continue;
            }
            let saved = fetch_text(&self.client, link.as_str()).and_then(|body| {
                fs::write(&path, body)
                    .with_context(|| format!("failed to write {}", path.display()))
            });
            match saved {
                Ok(()) => {
                    log::info!("saved {}", path.display());
                    report.saved.push(path);
                }
                Err(err) => {
                    log::warn!("skipping {link}: {err:#}");
                    report.failed.push((link.to_string(), format!("{err:#}")));
                }
            }
        }
        Ok(report)
    }
}

fn links_in(base: &Url, body: &str) -> BTreeSet<Url> {
    let host = base.host_str().unwrap_or_default().trim_start_matches("www.");
    let document = Html::parse_document(body);
    let anchors = Selector::parse("a[href]").unwrap_or_else(|err| panic!("anchor selector: {err}"));
    document
        .select(&anchors)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| is_internal_link(href, host))
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn internal_link_rules() {
        assert!(is_internal_link("archives/2020.html", "stallman.org"));
        assert!(is_internal_link("https://stallman.org/biographies.html", "stallman.org"));
        assert!(is_internal_link("https://www.stallman.org/a.html#x", "stallman.org"));
        assert!(!is_internal_link("#top", "stallman.org"));
        assert!(!is_internal_link("tel:123.html", "stallman.org"));
        assert!(!is_internal_link("notes.txt", "stallman.org"));
        assert!(!is_internal_link("https://gnu.org/index.html", "stallman.org"));
        assert!(!is_internal_link("//gnu.org/philosophy.html", "stallman.org"));
        assert!(is_internal_link("//www.stallman.org/saint.html", "stallman.org"));
    }

    #[test]
    fn collects_absolute_internal_links() {
        let base = Url::parse("https://stallman.org/").unwrap();
        let body = r##"
            <a href="saint.html">Saint</a>
            <a href="/archives/2024.html#jan">Jan</a>
            <a href="https://gnu.org/philosophy.html">GNU</a>
            <a href="//gnu.org/licenses.html">Licenses</a>
            <a href="#top">Top</a>
            <a href="saint.html">Dup</a>
        "##;
        let links: Vec<String> = links_in(&base, body).into_iter().map(String::from).collect();
        assert_eq!(
            links,
            vec![
                "https://stallman.org/archives/2024.html".to_string(),
                "https://stallman.org/saint.html".to_string(),
            ]
        );
    }

    #[test]
    fn mirror_file_names_flatten_paths() {
        let url = Url::parse("https://stallman.org/archives/2024.html").unwrap();
        assert_eq!(mirror_file_name(&url), "archives_2024.html");
        let root = Url::parse("https://stallman.org/").unwrap();
        assert_eq!(mirror_file_name(&root), "index.html");
    }

    #[test]
    fn page_cache_round_trips_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::new(dir.path().join("cache"));
        let url = "https://linuxbook.ir/all.html";
        assert_eq!(cache.get(url).unwrap(), None);
        cache.put(url, "<p>سلام</p>").unwrap();
        assert_eq!(cache.get(url).unwrap().as_deref(), Some("<p>سلام</p>"));

        let client = http_client(Duration::from_secs(1)).unwrap();
        assert_eq!(cache.fetch(&client, url).unwrap(), "<p>سلام</p>");
    }

    #[test]
    fn cache_keys_differ_per_url() {
        assert_ne!(
            cache_key("https://a.example/x?y=1"),
            cache_key("https://a.example/x?y=2")
        );
    }
}
