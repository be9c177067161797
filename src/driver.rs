//! The browser capability set the extraction pipeline consumes.
//!
//! `PageDriver` is implemented by the WebDriver client in
//! [`crate::webdriver`]; any other automation backend exposing the same
//! operations can stand in for it.

use std::time::Duration;

use tracing::debug;

use crate::error::DriverResult;
use crate::snapshot::PageSnapshot;

/// Opaque handle to a live element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// Document complete and no new network resources for a short window.
    NetworkIdle,
    /// Document `readyState` is complete.
    Load,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
}

#[allow(async_fn_in_trait)]
pub trait PageDriver {
    async fn navigate(&mut self, url: &str, wait: WaitCondition) -> DriverResult<()>;
    async fn find_all(&mut self, css: &str) -> DriverResult<Vec<ElementId>>;
    async fn find_within(&mut self, parent: &ElementId, css: &str) -> DriverResult<Vec<ElementId>>;
    /// `textContent` of the element.
    async fn text(&mut self, element: &ElementId) -> DriverResult<String>;
    async fn attribute(&mut self, element: &ElementId, name: &str) -> DriverResult<Option<String>>;
    async fn outer_html(&mut self, element: &ElementId) -> DriverResult<String>;
    async fn is_displayed(&mut self, element: &ElementId) -> DriverResult<bool>;
    async fn click(&mut self, element: &ElementId, timeout: Duration) -> DriverResult<()>;
    /// Mouse-wheel scroll by the given delta.
    async fn scroll_by(&mut self, dx: i64, dy: i64) -> DriverResult<()>;
    async fn press_key(&mut self, key: Key) -> DriverResult<()>;
    async fn title(&mut self) -> DriverResult<String>;
    async fn page_source(&mut self) -> DriverResult<String>;
    async fn screenshot_png(&mut self) -> DriverResult<Vec<u8>>;
}

pub async fn snapshot<D: PageDriver>(driver: &mut D) -> DriverResult<PageSnapshot> {
    let source = driver.page_source().await?;
    let title = driver.title().await.unwrap_or_default();
    Ok(PageSnapshot::new(source, title))
}

pub async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Lowercased `textContent` followed by the `aria-label`, the text a control
/// is recognized by.
pub async fn control_label<D: PageDriver>(driver: &mut D, element: &ElementId) -> String {
    let text = driver.text(element).await.unwrap_or_default();
    let aria = driver
        .attribute(element, "aria-label")
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    format!("{} {}", text.trim(), aria.trim()).to_lowercase()
}

/// Up to `limit` elements, across `selectors` in order, whose label passes
/// `accept`. Lookup failures count as "not here".
pub async fn find_controls<D, F>(
    driver: &mut D,
    selectors: &[&str],
    accept: F,
    limit: usize,
) -> Vec<ElementId>
where
    D: PageDriver,
    F: Fn(&str) -> bool,
{
    let mut found = Vec::new();
    for css in selectors {
        if found.len() >= limit {
            break;
        }
        let elements = match driver.find_all(css).await {
            Ok(elements) => elements,
            Err(err) => {
                debug!(selector = *css, error = %err, "control lookup failed");
                continue;
            }
        };
        for element in elements {
            if found.len() >= limit {
                return found;
            }
            if found.contains(&element) {
                continue;
            }
            let label = control_label(driver, &element).await;
            if accept(&label) {
                found.push(element);
            }
        }
    }
    found
}

pub async fn find_control<D, F>(driver: &mut D, selectors: &[&str], accept: F) -> Option<ElementId>
where
    D: PageDriver,
    F: Fn(&str) -> bool,
{
    find_controls(driver, selectors, accept, 1).await.into_iter().next()
}

/// Finds a matching control and clicks it. `true` when the click landed.
pub async fn click_control<D, F>(
    driver: &mut D,
    selectors: &[&str],
    accept: F,
    timeout: Duration,
) -> bool
where
    D: PageDriver,
    F: Fn(&str) -> bool,
{
    let Some(element) = find_control(driver, selectors, accept).await else {
        return false;
    };
    match driver.click(&element, timeout).await {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "control click failed");
            false
        }
    }
}
