//! Review harvesting: open the reviews tab, ask for newest-first, scroll
//! until enough nodes are attached, then parse them.

pub mod parse;

use scraper::ElementRef;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::acquire;
use crate::config::{Pacing, SortOrder};
use crate::driver::{self, ElementId, PageDriver, pause};
use crate::error::DriverResult;
use crate::export::{self, OutputDir};
use crate::extract::dismiss_panel;
use crate::lexicon::{self, Lexicon};
use crate::snapshot::char_len;

pub use parse::{ReviewRecord, ReviewerProfile};

const SORT_ATTEMPTS: usize = 3;
const SORT_RETRY_SCROLL_PX: i64 = 300;

const SORT_SELECTORS: &[&str] = &[
    "button[aria-label*=\"Sıralama\"]",
    "button[aria-label*=\"Sort\"]",
    "button[aria-controls*=\"sort\"]",
    "button[jsaction*=\"sort\"]",
    "div[role=\"button\"]",
    "button",
];

const NEWEST_SELECTORS: &[&str] = &[
    "div[role=\"menuitemradio\"]",
    "div[role=\"menuitem\"]",
    "[role=\"menuitemradio\"]",
    "[role=\"menuitem\"]",
];

const MIN_SCROLL_ITERATIONS: usize = 40;
const REVIEWS_PER_SCROLL: usize = 3;
const SCROLL_PX: i64 = 1000;
const FINAL_SCROLL_PX: i64 = 500;
const REST_EVERY: usize = 5;
const SAMPLE_EVERY: usize = 10;
const OVERLOAD_FACTOR: f64 = 1.2;

const MORE_BUTTON: &str = "button.w8nwRe";
const MORE_CANDIDATES: &str = "button, span[role=\"button\"], [aria-label]";
const MAX_MORE_LABEL_CHARS: usize = 20;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum HarvestState {
    NavigatingToReviews,
    SortRequested,
    Loading,
    Parsing,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarvestOutcome {
    /// Never empty: a sentinel record stands in when nothing was collected.
    pub records: Vec<ReviewRecord>,
    pub collected: usize,
    pub tab_opened: bool,
    pub sort_applied: bool,
    pub loaded_nodes: usize,
    pub node_selector: Option<&'static str>,
    pub failure: Option<String>,
}

/// Scroll iterations for a target count: `max(40, max_reviews / 3)`.
pub fn scroll_iterations(max_reviews: usize) -> usize {
    MIN_SCROLL_ITERATIONS.max(max_reviews / REVIEWS_PER_SCROLL)
}

/// Enough nodes are attached once the count reaches 1.2 times the target,
/// leaving headroom for nodes the parser drops.
pub fn loaded_enough(loaded: usize, max_reviews: usize) -> bool {
    loaded as f64 >= max_reviews as f64 * OVERLOAD_FACTOR
}

pub struct Harvester<'a, D> {
    driver: &'a mut D,
    lexicon: &'a Lexicon,
    pacing: &'a Pacing,
    max_reviews: usize,
    artifacts: Option<&'a OutputDir>,
    sort: SortOrder,
    state: HarvestState,
    tab_opened: bool,
    sort_applied: bool,
    loaded_nodes: usize,
    node_selector: Option<&'static str>,
    records: Vec<ReviewRecord>,
}

impl<'a, D: PageDriver> Harvester<'a, D> {
    pub fn new(driver: &'a mut D, lexicon: &'a Lexicon, pacing: &'a Pacing, max_reviews: usize) -> Self {
        Self {
            driver,
            lexicon,
            pacing,
            max_reviews,
            artifacts: None,
            sort: SortOrder::default(),
            state: HarvestState::NavigatingToReviews,
            tab_opened: false,
            sort_applied: false,
            loaded_nodes: 0,
            node_selector: None,
            records: Vec::new(),
        }
    }

    /// Where `reviews_tab.png` and `page_source.html` go.
    pub fn with_artifacts(mut self, dir: &'a OutputDir) -> Self {
        self.artifacts = Some(dir);
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Drives the state machine to `Done`. A page that cannot be read at all
    /// ends the harvest with an error sentinel record instead of an error.
    pub async fn run(mut self) -> HarvestOutcome {
        let failure = match self.drive().await {
            Ok(()) => None,
            Err(err) => {
                warn!(state = ?self.state, error = %err, "review harvest failed");
                Some(err.to_string())
            }
        };
        self.state = HarvestState::Done;

        let collected = if failure.is_some() { 0 } else { self.records.len() };
        let records = match &failure {
            Some(message) => vec![ReviewRecord::failure(self.lexicon, message)],
            None if self.records.is_empty() => {
                info!("no reviews collected");
                vec![ReviewRecord::no_reviews(self.lexicon)]
            }
            None => std::mem::take(&mut self.records),
        };
        info!(
            collected,
            sort_applied = self.sort_applied,
            tab_opened = self.tab_opened,
            "review harvest finished"
        );
        HarvestOutcome {
            records,
            collected,
            tab_opened: self.tab_opened,
            sort_applied: self.sort_applied,
            loaded_nodes: self.loaded_nodes,
            node_selector: self.node_selector,
            failure,
        }
    }

    async fn drive(&mut self) -> DriverResult<()> {
        loop {
            let next = match self.state {
                HarvestState::NavigatingToReviews => {
                    self.open_reviews().await;
                    match self.sort {
                        SortOrder::Newest => HarvestState::SortRequested,
                        SortOrder::Relevance => HarvestState::Loading,
                    }
                }
                HarvestState::SortRequested => {
                    self.sort_applied = self.request_newest().await;
                    if !self.sort_applied {
                        warn!("newest-first sort unavailable, keeping default order");
                    }
                    HarvestState::Loading
                }
                HarvestState::Loading => {
                    self.load().await;
                    HarvestState::Parsing
                }
                HarvestState::Parsing => {
                    self.parse().await?;
                    HarvestState::Done
                }
                HarvestState::Done => return Ok(()),
            };
            debug!(from = ?self.state, to = ?next, "harvest state");
            self.state = next;
        }
    }

    async fn open_reviews(&mut self) {
        self.tab_opened = acquire::open_reviews_tab(self.driver, self.pacing).await;
        if let Some(dir) = self.artifacts {
            export::save_screenshot(self.driver, dir, export::REVIEWS_TAB_PNG).await;
        }
    }

    async fn request_newest(&mut self) -> bool {
        let is_sort = |label: &str| lexicon::mentions(label, |l| l.sort_control);
        let is_newest = |label: &str| lexicon::mentions(label, |l| l.newest);

        for attempt in 0..SORT_ATTEMPTS {
            let menu_open =
                driver::click_control(self.driver, SORT_SELECTORS, is_sort, self.pacing.menu_click).await;
            if menu_open {
                pause(self.pacing.after_sort_click).await;
                let chosen =
                    driver::click_control(self.driver, NEWEST_SELECTORS, is_newest, self.pacing.menu_click)
                        .await;
                if chosen {
                    info!(attempt, "newest-first sort selected");
                    pause(self.pacing.after_sort_choice).await;
                    return true;
                }
                debug!(attempt, "sort menu has no newest entry");
                dismiss_panel(self.driver).await;
                pause(self.pacing.after_reveal).await;
            }
            if attempt + 1 < SORT_ATTEMPTS {
                if let Err(err) = self.driver.scroll_by(0, SORT_RETRY_SCROLL_PX).await {
                    debug!(error = %err, "sort retry scroll failed");
                }
                pause(self.pacing.between_sort_attempts).await;
            }
        }
        false
    }

    async fn load(&mut self) {
        let iterations = scroll_iterations(self.max_reviews);
        info!(iterations, target = self.max_reviews, "loading reviews");

        for i in 0..iterations {
            if let Err(err) = self.driver.scroll_by(0, SCROLL_PX).await {
                warn!(iteration = i, error = %err, "scroll failed, parsing what is loaded");
                break;
            }
            pause(self.pacing.scroll_step).await;
            if i % REST_EVERY == REST_EVERY - 1 {
                pause(self.pacing.scroll_rest).await;
            }
            if i > 0 && i % SAMPLE_EVERY == 0 {
                match self.driver.find_all(parse::LOADED_NODES).await {
                    Ok(nodes) => {
                        self.loaded_nodes = nodes.len();
                        info!(iteration = i, loaded = self.loaded_nodes, "reviews attached");
                        if loaded_enough(self.loaded_nodes, self.max_reviews) {
                            break;
                        }
                    }
                    Err(err) => debug!(error = %err, "review count sample failed"),
                }
            }
        }

        if let Err(err) = self.driver.scroll_by(0, FINAL_SCROLL_PX).await {
            debug!(error = %err, "final scroll failed");
        }
        pause(self.pacing.after_load).await;
    }

    async fn parse(&mut self) -> DriverResult<()> {
        let snapshot = driver::snapshot(self.driver).await?;
        if let Some(dir) = self.artifacts {
            export::save_page_source(dir, snapshot.source());
        }

        let Some(selection) = parse::select_review_nodes(&snapshot) else {
            info!("no qualifying review nodes");
            return Ok(());
        };
        self.node_selector = Some(selection.selector);
        info!(
            selector = selection.selector,
            nodes = selection.indices.len(),
            "review nodes located"
        );

        let live = match self.driver.find_all(selection.selector).await {
            Ok(live) => live,
            Err(err) => {
                debug!(error = %err, "live review lookup failed, parsing without expansion");
                Vec::new()
            }
        };
        let nodes = snapshot.select(selection.selector);
        let aligned = live.len() == nodes.len();
        if !aligned && !live.is_empty() {
            debug!(
                live = live.len(),
                snapshot = nodes.len(),
                "live review list differs from snapshot, parsing without expansion"
            );
        }

        for idx in selection.indices {
            if self.records.len() >= self.max_reviews {
                break;
            }
            let Some(node) = nodes.get(idx).copied() else {
                continue;
            };
            let Some(mut text) = parse::review_text(node) else {
                continue;
            };
            if let Some(element) = live.get(idx).filter(|_| aligned) {
                if self.same_review(element, node).await {
                    text = self.expand(element, text).await;
                }
            }
            match parse::parse_review(node, &text, self.lexicon) {
                Some(record) => {
                    debug!(reviewer = %record.reviewer, chars = char_len(&record.text), "review parsed");
                    self.records.push(record);
                }
                None => debug!(node = idx, "review body too short, skipped"),
            }
        }
        info!(collected = self.records.len(), "reviews parsed");
        Ok(())
    }

    async fn same_review(&mut self, element: &ElementId, node: ElementRef<'_>) -> bool {
        let Some(expected) = node.value().attr(parse::REVIEW_ID_ATTR) else {
            return true;
        };
        match self.driver.attribute(element, parse::REVIEW_ID_ATTR).await {
            Ok(Some(actual)) if actual == expected => true,
            Ok(actual) => {
                debug!(expected, actual = ?actual, "live node is a different review, not expanding");
                false
            }
            Err(err) => {
                debug!(error = %err, "review id lookup failed");
                false
            }
        }
    }

    /// Clicks the node's first visible "more" control and re-reads it.
    async fn expand(&mut self, element: &ElementId, text: String) -> String {
        let Some(button) = self.more_button(element).await else {
            return text;
        };
        if let Err(err) = self.driver.click(&button, self.pacing.expand_click).await {
            debug!(error = %err, "expand click failed");
            return text;
        }
        pause(self.pacing.after_expand).await;
        match self.driver.outer_html(element).await {
            Ok(html) => parse::longer_text(text, &html),
            Err(err) => {
                debug!(error = %err, "expanded review re-read failed");
                text
            }
        }
    }

    async fn more_button(&mut self, element: &ElementId) -> Option<ElementId> {
        let mut candidates = self.driver.find_within(element, MORE_BUTTON).await.unwrap_or_default();
        for candidate in self
            .driver
            .find_within(element, MORE_CANDIDATES)
            .await
            .unwrap_or_default()
        {
            if candidates.contains(&candidate) {
                continue;
            }
            let label = driver::control_label(self.driver, &candidate).await;
            if char_len(label.trim()) < MAX_MORE_LABEL_CHARS && lexicon::mentions(&label, |l| l.show_more) {
                candidates.push(candidate);
            }
        }
        for candidate in candidates {
            if self.driver.is_displayed(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }
}
