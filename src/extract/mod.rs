//! Prioritized strategy chains.
//!
//! Each metadata field owns an ordered list of steps. A step is either a
//! pure scan of the current [`PageSnapshot`] or a reveal: click a control,
//! read the panel it opens, dismiss it. The first candidate admitted by the
//! field's [`TextBounds`] wins; when every step comes up empty the field's
//! sentinel is used. Nothing in here returns an error.

pub mod fields;
pub mod hours;

use tracing::{debug, info};

use crate::config::Pacing;
use crate::driver::{self, Key, PageDriver, pause};
use crate::lexicon::Lexicon;
use crate::snapshot::{PageSnapshot, char_len, looks_like_markup, looks_like_url};

const REVEAL_ATTEMPTS: usize = 3;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Rating,
    ReviewCount,
    Address,
    Phone,
    Website,
    Category,
    PriceTier,
    Hours,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Name,
        Field::Rating,
        Field::ReviewCount,
        Field::Address,
        Field::Phone,
        Field::Website,
        Field::Category,
        Field::PriceTier,
        Field::Hours,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Rating => "rating",
            Field::ReviewCount => "review_count",
            Field::Address => "address",
            Field::Phone => "phone",
            Field::Website => "website",
            Field::Category => "category",
            Field::PriceTier => "price_tier",
            Field::Hours => "hours",
        }
    }

    pub fn sentinel(self, lexicon: &Lexicon) -> &'static str {
        match self {
            Field::Name => lexicon.sentinels.unknown_place,
            _ => lexicon.sentinels.unspecified,
        }
    }
}

pub type Probe = fn(&PageSnapshot, &Lexicon) -> Option<String>;

#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub probe: Probe,
}

/// Opens a panel, reads it, closes it.
#[derive(Clone, Copy)]
pub struct Reveal {
    pub name: &'static str,
    pub triggers: &'static [&'static str],
    /// Receives the lowercased control label.
    pub accept_trigger: fn(&str) -> bool,
    pub read: Probe,
}

#[derive(Clone, Copy)]
pub enum Step {
    Scan(Strategy),
    Reveal(Reveal),
}

impl Step {
    pub const fn scan(name: &'static str, probe: Probe) -> Self {
        Step::Scan(Strategy { name, probe })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Scan(s) => s.name,
            Step::Reveal(r) => r.name,
        }
    }
}

/// Sanity check every accepted value must pass.
#[derive(Debug, Copy, Clone)]
pub struct TextBounds {
    pub min_chars: usize,
    pub max_chars: usize,
    pub allow_url: bool,
}

impl TextBounds {
    pub const fn new(min_chars: usize, max_chars: usize) -> Self {
        Self {
            min_chars,
            max_chars,
            allow_url: false,
        }
    }

    pub const fn url(min_chars: usize, max_chars: usize) -> Self {
        Self {
            min_chars,
            max_chars,
            allow_url: true,
        }
    }

    pub fn admits(&self, text: &str) -> bool {
        let text = text.trim();
        let len = char_len(text);
        if text.is_empty() || len < self.min_chars || len > self.max_chars {
            return false;
        }
        if looks_like_markup(text) {
            return false;
        }
        self.allow_url || !looks_like_url(text)
    }
}

pub struct FieldChain {
    pub field: Field,
    pub bounds: TextBounds,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub value: String,
    /// Winning step, `None` when the sentinel was used.
    pub strategy: Option<&'static str>,
}

impl FieldChain {
    fn admit(&self, step: &Step, candidate: Option<String>) -> Option<String> {
        let candidate = candidate?.trim().to_string();
        if self.bounds.admits(&candidate) {
            return Some(candidate);
        }
        debug!(
            field = self.field.label(),
            strategy = step.name(),
            candidate = %candidate,
            "candidate rejected by bounds"
        );
        None
    }

    fn found(&self, step: &Step, value: String) -> Extracted {
        info!(
            field = self.field.label(),
            strategy = step.name(),
            value = %value,
            "field extracted"
        );
        Extracted {
            value,
            strategy: Some(step.name()),
        }
    }

    fn fallback(&self, lexicon: &Lexicon) -> Extracted {
        let value = self.field.sentinel(lexicon).to_string();
        info!(field = self.field.label(), sentinel = %value, "field not found");
        Extracted {
            value,
            strategy: None,
        }
    }

    /// Runs only the pure scans against one snapshot.
    pub fn first_match(&self, snapshot: &PageSnapshot, lexicon: &Lexicon) -> Extracted {
        for step in &self.steps {
            let Step::Scan(strategy) = step else {
                continue;
            };
            if let Some(value) = self.admit(step, (strategy.probe)(snapshot, lexicon)) {
                return self.found(step, value);
            }
        }
        self.fallback(lexicon)
    }

    /// Runs every step in order against the live page.
    pub async fn resolve<D: PageDriver>(
        &self,
        driver: &mut D,
        lexicon: &Lexicon,
        pacing: &Pacing,
    ) -> Extracted {
        let snapshot = match driver::snapshot(driver).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                debug!(field = self.field.label(), error = %err, "snapshot failed");
                None
            }
        };

        for step in &self.steps {
            let candidate = match step {
                Step::Scan(strategy) => snapshot
                    .as_ref()
                    .and_then(|snap| (strategy.probe)(snap, lexicon)),
                Step::Reveal(reveal) => run_reveal(driver, reveal, lexicon, pacing).await,
            };
            if let Some(value) = self.admit(step, candidate) {
                return self.found(step, value);
            }
            debug!(field = self.field.label(), strategy = step.name(), "no match");
        }
        self.fallback(lexicon)
    }
}

async fn run_reveal<D: PageDriver>(
    driver: &mut D,
    reveal: &Reveal,
    lexicon: &Lexicon,
    pacing: &Pacing,
) -> Option<String> {
    let triggers =
        driver::find_controls(driver, reveal.triggers, reveal.accept_trigger, REVEAL_ATTEMPTS)
            .await;
    for trigger in triggers {
        if let Err(err) = driver.click(&trigger, pacing.reveal_click).await {
            debug!(strategy = reveal.name, error = %err, "reveal click failed");
            // a timed-out click may still have opened the panel
            dismiss_panel(driver).await;
            continue;
        }
        pause(pacing.after_reveal).await;
        let value = match driver::snapshot(driver).await {
            Ok(snapshot) => (reveal.read)(&snapshot, lexicon),
            Err(err) => {
                debug!(strategy = reveal.name, error = %err, "reveal snapshot failed");
                None
            }
        };
        dismiss_panel(driver).await;
        if value.is_some() {
            return value;
        }
    }
    None
}

/// Closes whatever panel or menu is open.
pub async fn dismiss_panel<D: PageDriver>(driver: &mut D) {
    if let Err(err) = driver.press_key(Key::Escape).await {
        debug!(error = %err, "escape key failed");
    }
}
