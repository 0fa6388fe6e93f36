//! Persian text normalization applied to extracted document text.
//!
//! PDF extraction of Persian books leaves presentation-form glyphs, stray
//! combining marks, bidi controls and Arabic letter variants behind. The
//! normalizer folds those into a single canonical spelling so that
//! embeddings of the same word agree across sources.

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::document::{Document, SourceKind};

/// Zero-width non-joiner, kept because Persian morphology depends on it.
pub const ZWNJ: char = '\u{200c}';

const BIDI_CONTROL: &[char] = &[
    '\u{200e}', '\u{200f}', '\u{202a}', '\u{202b}', '\u{202c}', '\u{202d}', '\u{202e}',
    '\u{2066}', '\u{2067}', '\u{2068}', '\u{2069}',
];

/// Glyph repairs for artifacts the PDF extractor is known to emit.
const GLYPH_FIXES: &[(&str, &str)] = &[("\u{0645}\u{036c}", "\u{0645}\u{06cc}"), ("\u{0377}", "\u{06a9}")];

/// Arabic letter variants folded into their Persian forms.
const LETTER_FIXES: &[(char, char)] = &[('\u{064a}', '\u{06cc}'), ('\u{0643}', '\u{06a9}')];

/// Compiled substitution table for Persian text.
#[derive(Clone)]
pub struct PersianNormalizer {
    spaces: Regex,
    newline_padding: Regex,
    newline_runs: Regex,
    verb_prefix: Regex,
    plural_suffix: Regex,
}

impl Default for PersianNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PersianNormalizer {
    /// Compiles the substitution patterns.
    pub fn new() -> Self {
        Self {
            spaces: Regex::new(r"[ \t]+").expect("spaces pattern"),
            newline_padding: Regex::new(r" *\n *").expect("newline padding pattern"),
            newline_runs: Regex::new(r"\n{2,}").expect("newline run pattern"),
            verb_prefix: Regex::new(r"\b(ن?می)\s+").expect("verb prefix pattern"),
            plural_suffix: Regex::new(r"([آ-ی0-9A-Za-z])\s+(هایی|های|ها)\b")
                .expect("plural suffix pattern"),
        }
    }

    /// Returns the normalized form of `text`.
    ///
    /// The substitution pass is repeated until it reaches a fixed point, so
    /// `normalize(normalize(x)) == normalize(x)` holds even when one ZWNJ
    /// insertion exposes another match. After the first pass only whitespace
    /// is rewritten, and every later change removes at least one whitespace
    /// character, so the loop terminates.
    pub fn normalize(&self, text: &str) -> String {
        let mut current = self.pass(text);
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let mut text: String = text.nfkc().collect();

        for (from, to) in GLYPH_FIXES {
            if text.contains(from) {
                text = text.replace(from, to);
            }
        }

        let text: String = text
            .chars()
            .filter(|ch| !BIDI_CONTROL.contains(ch))
            .filter(|ch| !is_combining_mark(*ch))
            .map(|ch| {
                LETTER_FIXES
                    .iter()
                    .find(|(from, _)| *from == ch)
                    .map(|(_, to)| *to)
                    .unwrap_or(ch)
            })
            .collect();

        let text = self.spaces.replace_all(&text, " ");
        let text = self.newline_padding.replace_all(&text, "\n");
        let text = self.newline_runs.replace_all(&text, "\n");

        let prefix = format!("${{1}}{ZWNJ}");
        let text = self.verb_prefix.replace_all(&text, prefix.as_str());
        let plural = format!("${{1}}{ZWNJ}${{2}}");
        let text = self.plural_suffix.replace_all(&text, plural.as_str());

        text.trim().to_string()
    }
}

/// Normalizes a single string with a freshly compiled table.
pub fn normalize_text(text: &str) -> String {
    PersianNormalizer::new().normalize(text)
}

/// Normalizes the text of every document in place, returning how many
/// texts changed.
pub fn normalize_documents(docs: &mut [Document]) -> usize {
    rewrite(&PersianNormalizer::new(), docs.iter_mut())
}

/// Normalizes only documents whose source kind is listed in `kinds`,
/// returning how many texts changed.
pub fn normalize_documents_of(docs: &mut [Document], kinds: &[SourceKind]) -> usize {
    rewrite(
        &PersianNormalizer::new(),
        docs.iter_mut()
            .filter(|doc| kinds.contains(&doc.metadata.source)),
    )
}

fn rewrite<'a>(
    normalizer: &PersianNormalizer,
    docs: impl Iterator<Item = &'a mut Document>,
) -> usize {
    let mut rewritten = 0usize;
    for doc in docs {
        let normalized = normalizer.normalize(&doc.text);
        if normalized != doc.text {
            doc.set_text(normalized);
            rewritten += 1;
        }
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalize(text: &str) -> String {
        normalize_text(text)
    }

    #[test]
    fn unifies_arabic_letters() {
        assert_eq!(normalize("\u{064a}\u{0643}"), "\u{06cc}\u{06a9}");
    }

    #[test]
    fn strips_bidi_controls_but_keeps_zwnj() {
        let input = format!("\u{200f}کتاب{ZWNJ}ها\u{202c}");
        assert_eq!(normalize(&input), format!("کتاب{ZWNJ}ها"));
    }

    #[test]
    fn drops_combining_marks() {
        assert_eq!(normalize("كِتَاب"), "کتاب");
    }

    #[test]
    fn repairs_known_glyph_artifacts() {
        assert_eq!(normalize("\u{0377}ار"), "کار");
    }

    #[test]
    fn collapses_whitespace_and_blank_lines() {
        assert_eq!(normalize("  a \t b \n\n \n c  "), "a b\nc");
    }

    #[test]
    fn joins_verb_prefix_with_zwnj() {
        assert_eq!(normalize("من می روم"), format!("من می{ZWNJ}روم"));
        assert_eq!(normalize("او نمی داند"), format!("او نمی{ZWNJ}داند"));
    }

    #[test]
    fn joins_plural_suffix_with_zwnj() {
        assert_eq!(normalize("کفش ها"), format!("کفش{ZWNJ}ها"));
        assert_eq!(normalize("کتاب های خوب"), format!("کتاب{ZWNJ}های خوب"));
    }

    #[test]
    fn is_idempotent_on_overlapping_patterns() {
        let samples = [
            "کفش ها ها",
            "می می روم",
            "\u{200e}ريچارد   استالمن\n\n \nكيست؟",
            "Linux   and\tGNU\n\n\nfree software",
            "نرم افزار های آزاد می توانند",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn normalizes_only_selected_sources() {
        let mut docs = vec![
            Document::new("ي".into(), SourceKind::Pdf, "a.pdf#page=1", None, None),
            Document::new("ي".into(), SourceKind::HtmlMirror, "b.html", None, None),
        ];
        let rewritten = normalize_documents_of(&mut docs, &[SourceKind::Pdf]);
        assert_eq!(rewritten, 1);
        assert_eq!(docs[0].text, "\u{06cc}");
        assert_eq!(docs[1].text, "ي");
    }

    #[test]
    fn counts_only_changed_documents() {
        let mut docs = vec![
            Document::new("کتاب".into(), SourceKind::Pdf, "a.pdf#page=1", None, None),
            Document::new("ي".into(), SourceKind::Pdf, "a.pdf#page=2", None, None),
        ];
        assert_eq!(normalize_documents(&mut docs), 1);
        assert_eq!(normalize_documents(&mut docs), 0);
    }

    #[test]
    fn long_suffix_chains_reach_a_fixed_point() {
        let input = format!("کفش{}", " ها".repeat(40));
        let expected = format!("کفش{}", format!("{ZWNJ}ها").repeat(40));
        assert_eq!(normalize(&input), expected);
    }
}
