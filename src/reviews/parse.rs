//! Turning one review node of a snapshot into a [`ReviewRecord`].

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::Serialize;

use crate::lexicon::{self, Lexicon};
use crate::snapshot::{PageSnapshot, char_len, looks_like_url, raw_text, select_in, word_count};

pub const NODE_SELECTORS: &[&str] = &[
    "div.jftiEf",
    "div[data-review-id]",
    "div[jsaction*=\"reviewActionsGroup\"]",
    "div[jslog*=\"review\"]",
    "div.fontBodyMedium[style*=\"line-height\"]",
    "div[class*=\"review\"]",
    "[jsinstance*=\"review\"]",
    "div[data-hveid]",
];

pub const REVIEW_ID_ATTR: &str = "data-review-id";

/// Cheap count of loaded review containers, sampled while scrolling.
pub const LOADED_NODES: &str = "div.jftiEf, div[data-review-id], div[jslog*=\"review\"]";

const RATING_MARKERS: &str = "span[role=\"img\"], span[aria-label*=\"yıldız\"], \
     span[aria-label*=\"star\"], div[role=\"img\"]";

const MIN_NODE_CHARS: usize = 50;
const PREFERRED_NODE_COUNT: usize = 5;

/// A review needs strictly more words than this.
pub const MIN_REVIEW_WORDS: usize = 10;

const TEXT_SELECTORS: &[&str] = &["span", "div > span", "*[role=\"text\"]", "[jscontroller]"];

const USER_BLOCK_SELECTORS: &[&str] = &["a", "div.d4r55", "div[class*='user']", "div.WNxzHc"];
const NAME_FALLBACK_SELECTORS: &[&str] = &[
    "div.d4r55",
    "a",
    "div > a",
    "div[class*=\"user\"]",
    "div[class*=\"name\"]",
];
const MAX_NAME_CHARS: usize = 50;
const TRUNCATED_NAME_CHARS: usize = 47;

const DATE_SELECTORS: &[&str] = &[
    "span.rsqaWe",
    "span[class*=\"date\"]",
    "span[aria-label*=\"gün\"]",
    "span[aria-label*=\"day\"]",
];
const MAX_RELATIVE_DATE_CHARS: usize = 30;

const REVIEW_RATING_SELECTORS: &[&str] = &[
    "span.kvMYJc",
    "span[role=\"img\"]",
    "div[role=\"img\"]",
    "span[aria-label*=\"yıldız\"]",
    "span[aria-label*=\"star\"]",
];

const MAX_PROFILE_TEXT_CHARS: usize = 80;

static YEAR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d{4}").ok());

static GUIDE_LEVEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(r"(?:{})\s*(\d+)", alternation(|l| l.guide_level))).ok()
});

static CONTRIBUTIONS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(r"(\d+)\s*(?:{})", alternation(|l| l.contribution_words))).ok()
});

static PHOTOS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(r"(\d+)\s*(?:{})", alternation(|l| l.photo_words))).ok()
});

fn alternation(set: lexicon::KeywordSet) -> String {
    lexicon::keywords(set)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewerProfile {
    pub local_guide: bool,
    pub guide_level: Option<String>,
    pub review_count: Option<String>,
    pub photo_count: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRecord {
    pub reviewer: String,
    pub date: String,
    pub rating: String,
    pub text: String,
    pub profile: ReviewerProfile,
}

impl ReviewRecord {
    pub fn no_reviews(lexicon: &Lexicon) -> Self {
        Self::placeholder(lexicon.sentinels.no_reviews_name, lexicon.sentinels.no_reviews_text.to_string())
    }

    pub fn failure(lexicon: &Lexicon, message: &str) -> Self {
        Self::placeholder(
            lexicon.sentinels.error_name,
            format!("{}: {message}", lexicon.sentinels.error_prefix),
        )
    }

    fn placeholder(reviewer: &str, text: String) -> Self {
        Self {
            reviewer: reviewer.to_string(),
            date: String::new(),
            rating: String::new(),
            text,
            profile: ReviewerProfile::default(),
        }
    }
}

/// Which selector located the review nodes and which of its matches
/// qualified, as indices into that selector's match list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSelection {
    pub selector: &'static str,
    pub indices: Vec<usize>,
}

fn qualifies(node: ElementRef<'_>) -> bool {
    !select_in(node, RATING_MARKERS).is_empty()
        && char_len(&node.text().collect::<String>()) > MIN_NODE_CHARS
}

/// First selector with more than five qualifying nodes, else the first with
/// any.
pub fn select_review_nodes(snapshot: &PageSnapshot) -> Option<NodeSelection> {
    let mut fallback: Option<NodeSelection> = None;
    for selector in NODE_SELECTORS {
        let indices = snapshot
            .select(selector)
            .into_iter()
            .enumerate()
            .filter(|(_, node)| qualifies(*node))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        if indices.len() > PREFERRED_NODE_COUNT {
            return Some(NodeSelection { selector, indices });
        }
        if fallback.is_none() && !indices.is_empty() {
            fallback = Some(NodeSelection { selector, indices });
        }
    }
    fallback
}

/// First descendant text long enough to be a review body.
pub fn review_text(node: ElementRef<'_>) -> Option<String> {
    TEXT_SELECTORS.iter().find_map(|css| {
        select_in(node, css)
            .into_iter()
            .map(raw_text)
            .find(|text| word_count(text) > MIN_REVIEW_WORDS)
    })
}

/// Re-reads a node from its expanded markup and keeps the longer body.
pub fn longer_text(current: String, expanded_html: &str) -> String {
    let fragment = Html::parse_fragment(expanded_html);
    let root = fragment.root_element();
    let current_len = char_len(&current);
    TEXT_SELECTORS
        .iter()
        .find_map(|css| {
            select_in(root, css)
                .into_iter()
                .map(raw_text)
                .find(|text| char_len(text) > current_len && word_count(text) > MIN_REVIEW_WORDS)
        })
        .unwrap_or(current)
}

/// Parses everything but the body, which the caller has already settled.
/// `None` when the body is too short to count as a review.
pub fn parse_review(node: ElementRef<'_>, text: &str, lexicon: &Lexicon) -> Option<ReviewRecord> {
    let text = text.trim();
    if text.is_empty() || word_count(text) <= MIN_REVIEW_WORDS {
        return None;
    }
    let block = user_block(node);
    let reviewer = reviewer_name(node, block, lexicon);
    Some(ReviewRecord {
        reviewer,
        date: review_date(node, lexicon),
        rating: review_rating(node, lexicon),
        text: text.to_string(),
        profile: reviewer_profile(node, block, lexicon),
    })
}

fn is_contributor_link(el: ElementRef<'_>) -> bool {
    el.value().attr("href").is_some_and(|href| href.contains("contrib"))
}

fn user_block(node: ElementRef<'_>) -> Option<ElementRef<'_>> {
    USER_BLOCK_SELECTORS.iter().find_map(|css| {
        select_in(node, css).into_iter().find(|el| {
            let content = raw_text(*el);
            if content.is_empty() {
                return false;
            }
            if is_contributor_link(*el) {
                return true;
            }
            let len = char_len(&content);
            len > 2 && len < MAX_NAME_CHARS && !content.contains('+') && !looks_like_url(&content)
        })
    })
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

fn reviewer_name(node: ElementRef<'_>, block: Option<ElementRef<'_>>, lexicon: &Lexicon) -> String {
    let sentinel = lexicon.sentinels.unknown_reviewer;
    let mut name = block
        .map(|el| first_line(&raw_text(el)).to_string())
        .unwrap_or_default();

    if name.is_empty() || char_len(&name) > MAX_NAME_CHARS {
        let fallback = NAME_FALLBACK_SELECTORS.iter().find_map(|css| {
            select_in(node, css).into_iter().map(raw_text).find(|text| {
                let len = char_len(text);
                len > 2
                    && len < MAX_NAME_CHARS
                    && !text.contains('+')
                    && !lexicon::mentions(text, |l| l.review_words)
                    && !lexicon::mentions(text, |l| l.star_words)
            })
        });
        if let Some(found) = fallback {
            name = found;
        }
    }

    if name.is_empty() {
        return sentinel.to_string();
    }
    truncate_name(&name)
}

/// Names longer than 50 characters are cut to 47 plus `...`.
pub fn truncate_name(name: &str) -> String {
    if char_len(name) <= MAX_NAME_CHARS {
        return name.to_string();
    }
    let mut cut = name.chars().take(TRUNCATED_NAME_CHARS).collect::<String>();
    cut.push_str("...");
    cut
}

fn review_date(node: ElementRef<'_>, lexicon: &Lexicon) -> String {
    let has_year = |text: &str| YEAR.as_ref().is_some_and(|re| re.is_match(text));
    let labelled = DATE_SELECTORS.iter().find_map(|css| {
        select_in(node, css)
            .into_iter()
            .map(raw_text)
            .find(|text| !text.is_empty() && (lexicon::mentions(text, |l| l.time_units) || has_year(text)))
    });
    if let Some(date) = labelled {
        return date;
    }

    select_in(node, "span")
        .into_iter()
        .map(raw_text)
        .find(|text| {
            char_len(text) < MAX_RELATIVE_DATE_CHARS
                && lexicon::mentions(text, |l| l.ago)
                && lexicon::mentions(text, |l| l.time_units)
        })
        .unwrap_or_else(|| lexicon.sentinels.undated_review.to_string())
}

fn review_rating(node: ElementRef<'_>, lexicon: &Lexicon) -> String {
    REVIEW_RATING_SELECTORS
        .iter()
        .find_map(|css| {
            let marker = select_in(node, css).into_iter().next()?;
            let label = marker.value().attr("aria-label")?.trim();
            lexicon::mentions(label, |l| l.star_words).then(|| label.to_string())
        })
        .unwrap_or_else(|| lexicon.sentinels.unspecified.to_string())
}

fn capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
    let caps = re.as_ref()?.captures(text)?;
    Some(caps.get(1)?.as_str().to_string())
}

fn is_leaf(el: ElementRef<'_>) -> bool {
    el.children().all(|child| !child.value().is_element())
}

/// Reviewer badge and counters, read from the user block and the node's
/// short leaf texts. Containers are skipped so adjacent counters never run
/// together.
fn reviewer_profile(node: ElementRef<'_>, block: Option<ElementRef<'_>>, lexicon: &Lexicon) -> ReviewerProfile {
    let mut texts = Vec::new();
    if let Some(block) = block {
        texts.push(raw_text(block));
    }
    for el in select_in(node, "span, div").into_iter().filter(|el| is_leaf(*el)) {
        let text = raw_text(el);
        if !text.is_empty() && char_len(&text) < MAX_PROFILE_TEXT_CHARS && !texts.contains(&text) {
            texts.push(text);
        }
    }
    let info = texts.join(" | ").to_lowercase();

    ReviewerProfile {
        local_guide: lexicon::mentions(&info, |l| l.local_guide),
        guide_level: capture(&GUIDE_LEVEL, &info).map(|n| format!("{} {n}", lexicon.level_label)),
        review_count: capture(&CONTRIBUTIONS, &info)
            .map(|n| format!("{n} {}", lexicon.contributions_suffix)),
        photo_count: capture(&PHOTOS, &info).map(|n| format!("{n} {}", lexicon.photos_suffix)),
    }
}
