//! Parsed view of the live document at one moment.
//!
//! Every pure extraction strategy reads a `PageSnapshot`; nothing in here
//! touches the browser.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static URL_LIKE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)https?://|www\.|\.(com|net|org)\b").ok());

pub struct PageSnapshot {
    document: Html,
    title: String,
    source: String,
}

impl PageSnapshot {
    pub fn new(source: String, title: String) -> Self {
        let document = Html::parse_document(&source);
        let title = if title.trim().is_empty() {
            first_text(&document, "title")
        } else {
            normalize_text(&title)
        };
        Self {
            document,
            title,
            source,
        }
    }

    /// Snapshot of a standalone document; the title comes from `<title>`.
    pub fn from_html(source: &str) -> Self {
        Self::new(source.to_string(), String::new())
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Elements matching `css`; an unparsable selector matches nothing.
    pub fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        select_in(self.document.root_element(), css)
    }

    /// Whitespace-collapsed text of the whole body.
    pub fn body_text(&self) -> String {
        normalize_text(&self.document.root_element().text().collect::<Vec<_>>().join(" "))
    }

    pub fn meta_content(&self, css: &str) -> Option<String> {
        self.select(css)
            .into_iter()
            .find_map(|el| el.value().attr("content"))
            .map(normalize_text)
            .filter(|s| !s.is_empty())
    }
}

pub fn select_in<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    let selector = match Selector::parse(css) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    scope.select(&selector).collect()
}

fn first_text(doc: &Html, css: &str) -> String {
    select_in(doc.root_element(), css)
        .into_iter()
        .map(|el| normalize_text(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// Text content of an element, concatenated the way `textContent` is, with
/// icon-font glyphs removed and the ends trimmed.
pub fn raw_text(el: ElementRef<'_>) -> String {
    strip_glyphs(&el.text().collect::<String>()).trim().to_string()
}

pub fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops private-use code points that icon fonts render as pictograms.
pub fn strip_glyphs(input: &str) -> String {
    input
        .chars()
        .filter(|c| !('\u{E000}'..='\u{F8FF}').contains(c))
        .collect()
}

pub fn looks_like_url(text: &str) -> bool {
    URL_LIKE.as_ref().is_some_and(|re| re.is_match(text))
}

pub fn looks_like_markup(text: &str) -> bool {
    text.contains('<') && text.contains('>')
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_to_title_tag() {
        let snap = PageSnapshot::from_html(
            "<html><head><title> Kebapçı  Halil - Google Haritalar</title></head></html>",
        );
        assert_eq!(snap.title(), "Kebapçı Halil - Google Haritalar");
    }

    #[test]
    fn bad_selectors_match_nothing() {
        let snap = PageSnapshot::from_html("<p>hi</p>");
        assert!(snap.select("p:has-text(\"hi\")").is_empty());
        assert_eq!(snap.select("p").len(), 1);
    }

    #[test]
    fn raw_text_strips_icon_glyphs() {
        let snap = PageSnapshot::from_html("<button>\u{E0C8}<span> Atatürk Cad. No:5</span></button>");
        let button = snap.select("button")[0];
        assert_eq!(raw_text(button), "Atatürk Cad. No:5");
    }

    #[test]
    fn url_detection() {
        assert!(looks_like_url("www.example.com"));
        assert!(looks_like_url("https://x.io"));
        assert!(looks_like_url("lokanta.net"));
        assert!(!looks_like_url("Lezzet Durağı"));
    }
}
