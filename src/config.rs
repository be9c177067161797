//! Run configuration: per-run context plus every pause and timeout used
//! while driving the page.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;

use crate::lexicon::{Language, Lexicon};

pub const DEFAULT_MAX_REVIEWS: usize = 200;
const SESSION_ID_LEN: usize = 8;
const SESSION_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    /// Whatever order the listing shows; no sort is requested.
    Relevance,
}

/// Fixed pauses and per-action timeouts.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub settle: Duration,
    pub after_consent: Duration,
    pub after_tab: Duration,
    pub after_reveal: Duration,
    pub after_nudge: Duration,
    pub after_sort_click: Duration,
    pub after_sort_choice: Duration,
    pub between_sort_attempts: Duration,
    pub scroll_step: Duration,
    pub scroll_rest: Duration,
    pub after_load: Duration,
    pub after_expand: Duration,
    pub consent_click: Duration,
    pub tab_click: Duration,
    pub reveal_click: Duration,
    pub menu_click: Duration,
    pub expand_click: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(5),
            after_consent: Duration::from_secs(2),
            after_tab: Duration::from_secs(2),
            after_reveal: Duration::from_secs(1),
            after_nudge: Duration::from_secs(1),
            after_sort_click: Duration::from_secs(2),
            after_sort_choice: Duration::from_secs(3),
            between_sort_attempts: Duration::from_secs(2),
            scroll_step: Duration::from_millis(300),
            scroll_rest: Duration::from_secs(1),
            after_load: Duration::from_secs(3),
            after_expand: Duration::from_millis(500),
            consent_click: Duration::from_secs(5),
            tab_click: Duration::from_secs(5),
            reveal_click: Duration::from_secs(3),
            menu_click: Duration::from_secs(3),
            expand_click: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    /// No pauses at all; click timeouts stay bounded.
    pub fn instant() -> Self {
        Self {
            settle: Duration::ZERO,
            after_consent: Duration::ZERO,
            after_tab: Duration::ZERO,
            after_reveal: Duration::ZERO,
            after_nudge: Duration::ZERO,
            after_sort_click: Duration::ZERO,
            after_sort_choice: Duration::ZERO,
            between_sort_attempts: Duration::ZERO,
            scroll_step: Duration::ZERO,
            scroll_rest: Duration::ZERO,
            after_load: Duration::ZERO,
            after_expand: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

/// Everything one invocation needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub session_id: String,
    pub url: String,
    pub max_reviews: usize,
    pub sort: SortOrder,
    pub output_root: PathBuf,
    pub language: Language,
    pub write_json: bool,
    pub pacing: Pacing,
}

impl RunConfig {
    pub fn new(url: impl Into<String>, max_reviews: usize, output_root: impl AsRef<Path>) -> Self {
        Self {
            session_id: generate_session_id(),
            url: url.into(),
            max_reviews,
            sort: SortOrder::default(),
            output_root: output_root.as_ref().to_path_buf(),
            language: Language::Tr,
            write_json: false,
            pacing: Pacing::default(),
        }
    }

    pub fn lexicon(&self) -> &'static Lexicon {
        self.language.lexicon()
    }
}

pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ALPHABET[rng.random_range(0..SESSION_ALPHABET.len())] as char)
        .collect()
}

/// The user's download directory, else `~/Downloads`, else the working
/// directory.
pub fn default_output_root() -> PathBuf {
    if let Some(dir) = dirs::download_dir() {
        return dir;
    }
    if let Some(home) = dirs::home_dir() {
        return home.join("Downloads");
    }
    PathBuf::from(".")
}

/// Parses the interactive review-count answer; blank or invalid input falls
/// back to the default.
pub fn parse_max_reviews(input: &str) -> usize {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_REVIEWS)
}
