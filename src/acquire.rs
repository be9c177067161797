//! Getting the listing page into a readable state.

use tracing::{debug, info, warn};

use crate::config::Pacing;
use crate::driver::{self, PageDriver, WaitCondition, pause};
use crate::error::{Result, ScrapeError};
use crate::lexicon::{self, Lexicon};

const CONSENT_SELECTORS: &[&str] = &[
    "button[aria-label*=\"Accept\"]",
    "button[aria-label*=\"Kabul\"]",
    "form button",
    "button",
];

const OVERVIEW_TAB_SELECTORS: &[&str] = &[
    "button[data-tab-index=\"0\"]",
    "button[role=\"tab\"]",
    "div[role=\"tab\"]",
];

const REVIEWS_TAB_SELECTORS: &[&str] = &[
    "button[data-tab-index=\"1\"]",
    "button[role=\"tab\"]",
    "div[role=\"tab\"]",
    "div[role=\"tablist\"] > div:nth-child(2)",
];

const NUDGE_PX: i64 = 300;

/// Loads `url`, waiting for the network to go quiet and falling back once
/// to a plain load wait.
pub async fn navigate<D: PageDriver>(driver: &mut D, url: &str) -> Result<()> {
    match driver.navigate(url, WaitCondition::NetworkIdle).await {
        Ok(()) => return Ok(()),
        Err(err) => warn!(url, error = %err, "network-idle navigation failed, retrying with load wait"),
    }
    driver
        .navigate(url, WaitCondition::Load)
        .await
        .map_err(|err| ScrapeError::Navigation {
            url: url.to_string(),
            reason: err.to_string(),
        })
}

fn is_consent_button(label: &str) -> bool {
    lexicon::mentions(label, |l| l.consent)
}

/// Clicks the cookie/consent button when one is shown.
pub async fn accept_consent<D: PageDriver>(driver: &mut D, pacing: &Pacing) -> bool {
    let clicked =
        driver::click_control(driver, CONSENT_SELECTORS, is_consent_button, pacing.consent_click).await;
    if clicked {
        info!("consent dialog accepted");
        pause(pacing.after_consent).await;
    } else {
        debug!("no consent dialog");
    }
    clicked
}

fn is_overview_tab(label: &str) -> bool {
    lexicon::mentions(label, |l| l.overview_tab)
}

fn is_reviews_tab(label: &str) -> bool {
    lexicon::mentions(label, |l| l.reviews_tab)
}

pub async fn open_overview_tab<D: PageDriver>(driver: &mut D, pacing: &Pacing) -> bool {
    let opened =
        driver::click_control(driver, OVERVIEW_TAB_SELECTORS, is_overview_tab, pacing.tab_click).await;
    if opened {
        info!("overview tab opened");
        pause(pacing.after_tab).await;
    }
    opened
}

pub async fn open_reviews_tab<D: PageDriver>(driver: &mut D, pacing: &Pacing) -> bool {
    let opened =
        driver::click_control(driver, REVIEWS_TAB_SELECTORS, is_reviews_tab, pacing.tab_click).await;
    if opened {
        info!("reviews tab opened");
        pause(pacing.after_tab).await;
    } else {
        warn!("reviews tab not found, harvesting the current view");
    }
    opened
}

/// Small scroll so lazily rendered detail rows get attached.
pub async fn nudge<D: PageDriver>(driver: &mut D, pacing: &Pacing) {
    if let Err(err) = driver.scroll_by(0, NUDGE_PX).await {
        debug!(error = %err, "nudge scroll failed");
    }
    pause(pacing.after_nudge).await;
}

/// Navigation, consent and the settle pause. Only the navigation can fail.
pub async fn prepare_page<D: PageDriver>(
    driver: &mut D,
    url: &str,
    lexicon: &Lexicon,
    pacing: &Pacing,
) -> Result<()> {
    info!(url, language = ?lexicon.language, "loading listing");
    navigate(driver, url).await?;
    accept_consent(driver, pacing).await;
    pause(pacing.settle).await;
    Ok(())
}

/// Switches to the overview and scrolls a little; run after the name is read.
pub async fn show_overview<D: PageDriver>(driver: &mut D, pacing: &Pacing) {
    open_overview_tab(driver, pacing).await;
    nudge(driver, pacing).await;
}
