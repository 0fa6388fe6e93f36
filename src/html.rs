//! Readable-text extraction from HTML pages and MediaWiki article bodies.

use scraper::{ElementRef, Html, Selector};

/// Tags whose subtrees never contribute readable text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "template", "noscript", "svg", "nav", "header", "footer", "form",
];

/// Additional tags skipped inside encyclopedia articles.
const WIKI_SKIP_TAGS: &[&str] = &["table", "sup", "figure", "aside"];

/// Wikipedia furniture that is not article prose.
const WIKI_SKIP_CLASSES: &[&str] = &[
    "ambox",
    "authority-control",
    "catlinks",
    "hatnote",
    "infobox",
    "metadata",
    "mw-editsection",
    "mw-empty-elt",
    "navbox",
    "noprint",
    "reference",
    "references",
    "reflist",
    "refbegin",
    "shortdescription",
    "sidebar",
    "thumb",
    "toc",
    "vertical-navbox",
];

const WIKI_SKIP_CLASS_PREFIXES: &[&str] = &["vector-toc", "toclimit-", "mw-references"];

/// Readable content pulled out of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// `<title>` text, when present.
    pub title: Option<String>,
    /// `<html lang>` attribute, when present.
    pub language: Option<String>,
    /// Block texts joined with blank lines.
    pub text: String,
}

/// Extracts title, language and readable text from a generic HTML page.
pub fn extract_page(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);
    let title = first_text(&document, "title");
    let language = document
        .select(&selector("html"))
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty());

    let root = ["article", "main"]
        .iter()
        .find_map(|name| sole_element(&document, name))
        .or_else(|| document.select(&selector("body")).next())
        .unwrap_or_else(|| document.root_element());

    let text = collect_blocks(root, &Filter::Page);
    ExtractedPage {
        title,
        language,
        text,
    }
}

/// Extracts article prose from rendered MediaWiki HTML, skipping infoboxes,
/// navigation boxes, references and edit links.
pub fn extract_wiki_article(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = [
        "#mw-content-text .mw-parser-output",
        ".mw-parser-output",
        "#mw-content-text",
        "body",
    ]
    .iter()
    .find_map(|name| document.select(&selector(name)).next())
    .unwrap_or_else(|| document.root_element());
    collect_blocks(root, &Filter::Wiki)
}

enum Filter {
    Page,
    Wiki,
}

impl Filter {
    fn skips(&self, element: &scraper::node::Element) -> bool {
        let tag = element.name();
        if tag == "html" || tag == "body" {
            return false;
        }
        if SKIP_TAGS.contains(&tag) {
            return true;
        }
        match self {
            Self::Page => false,
            Self::Wiki => {
                WIKI_SKIP_TAGS.contains(&tag)
                    || element.classes().any(|class| {
                        WIKI_SKIP_CLASSES.contains(&class)
                            || WIKI_SKIP_CLASS_PREFIXES
                                .iter()
                                .any(|prefix| class.starts_with(prefix))
                    })
            }
        }
    }

    fn skips_with_ancestors(&self, element: &ElementRef<'_>) -> bool {
        self.skips(element.value())
            || element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| self.skips(ancestor.value()))
    }
}

fn collect_blocks(root: ElementRef<'_>, filter: &Filter) -> String {
    let blocks_selector = selector("h1, h2, h3, h4, h5, h6, p, li, blockquote, pre, dd, dt");
    let mut blocks: Vec<String> = Vec::new();
    for element in root.select(&blocks_selector) {
        if filter.skips_with_ancestors(&element) {
            continue;
        }
        // Nested block elements are emitted on their own.
        if element.value().name() != "pre" && has_block_ancestor_within(&element, &root) {
            continue;
        }
        let text = if element.value().name() == "pre" {
            collapse_newlines(&element_text(element, filter))
        } else {
            collapse_whitespace(&element_text(element, filter))
        };
        if !text.is_empty() {
            blocks.push(text);
        }
    }

    if blocks.is_empty() {
        let text = collapse_whitespace(&element_text(root, filter));
        if !text.is_empty() {
            blocks.push(text);
        }
    }
    blocks.join("\n\n")
}

fn has_block_ancestor_within(element: &ElementRef<'_>, root: &ElementRef<'_>) -> bool {
    for ancestor in element.ancestors() {
        if ancestor.id() == root.id() {
            return false;
        }
        if let Some(el) = ElementRef::wrap(ancestor) {
            if matches!(el.value().name(), "p" | "li" | "blockquote" | "dd" | "dt") {
                return true;
            }
        }
    }
    false
}

fn element_text(element: ElementRef<'_>, filter: &Filter) -> String {
    let mut out = String::new();
    push_text(element, filter, &mut out);
    out
}

fn push_text(element: ElementRef<'_>, filter: &Filter, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if filter.skips(child_el.value()) {
                continue;
            }
            if child_el.value().name() == "br" {
                out.push('\n');
            }
            push_text(child_el, filter, out);
        }
    }
}

/// The only element matching `name`, or `None` when there are zero or several.
fn sole_element<'a>(document: &'a Html, name: &str) -> Option<ElementRef<'a>> {
    let css = selector(name);
    let mut matches = document.select(&css);
    let first = matches.next()?;
    matches.next().is_none().then_some(first)
}

fn first_text(document: &Html, name: &str) -> Option<String> {
    document
        .select(&selector(name))
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|err| panic!("invalid built-in selector {css:?}: {err}"))
}

fn collapse_whitespace(input: &str) -> String {
    let mut buf = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space && !buf.is_empty() {
                buf.push(' ');
            }
            last_space = true;
        } else {
            buf.push(ch);
            last_space = false;
        }
    }
    buf.trim_end().to_string()
}

fn collapse_newlines(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_title_language_and_blocks() {
        let html = r#"
            <html lang="fa">
              <head><title> لینوکس و زندگی </title><style>p{}</style></head>
              <body>
                <nav><p>menu</p></nav>
                <article>
                  <h1>Heading</h1>
                  <p>First paragraph with <b>bold</b> text.</p>
                  <ul><li>Item <em>one</em></li></ul>
                </article>
              </body>
            </html>
        "#;
        let page = extract_page(html);
        assert_eq!(page.title.as_deref(), Some("لینوکس و زندگی"));
        assert_eq!(page.language.as_deref(), Some("fa"));
        assert_eq!(
            page.text,
            "Heading\n\nFirst paragraph with bold text.\n\nItem one"
        );
    }

    #[test]
    fn several_articles_keep_the_whole_body() {
        let page = extract_page(
            "<body><article><p>first post</p></article>\
             <article><p>second post</p></article><p>outside</p></body>",
        );
        assert_eq!(page.text, "first post\n\nsecond post\n\noutside");
    }

    #[test]
    fn falls_back_to_root_text_without_blocks() {
        let page = extract_page("<html><body><div>Just   a div</div></body></html>");
        assert_eq!(page.text, "Just a div");
        assert_eq!(page.title, None);
    }

    #[test]
    fn nested_paragraph_in_list_item_is_emitted_once() {
        let page = extract_page("<body><ul><li><p>Nested</p></li></ul></body>");
        assert_eq!(page.text, "Nested");
    }

    #[test]
    fn wiki_article_skips_furniture() {
        let html = r#"
            <div class="mw-parser-output">
              <table class="infobox"><tr><td>Ignore</td></tr></table>
              <div class="hatnote">See also</div>
              <p>Richard Stallman<sup class="reference">[1]</sup> founded GNU.</p>
              <div class="navbox"><p>Nav</p></div>
              <h2>Life<span class="mw-editsection">[edit]</span></h2>
              <ol class="references"><li>Ref</li></ol>
            </div>
        "#;
        assert_eq!(
            extract_wiki_article(html),
            "Richard Stallman founded GNU.\n\nLife"
        );
    }
}
