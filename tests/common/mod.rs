#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use placescope::driver::{ElementId, Key, PageDriver, WaitCondition};
use placescope::error::{DriverError, DriverResult};
use scraper::{ElementRef, Html, Selector};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

struct ClickRule {
    from: String,
    needle: String,
    to: String,
}

struct ScrollRule {
    from: String,
    after: usize,
    to: String,
}

/// In-memory browser over named page states. Clicks, Escape and scrolling
/// move between states according to the rules it was built with.
pub struct ScriptedDriver {
    pages: HashMap<String, String>,
    live_pages: HashMap<String, String>,
    initial: String,
    state: String,
    click_rules: Vec<ClickRule>,
    escape_rules: HashMap<String, String>,
    scroll_rules: Vec<ScrollRule>,
    failing_waits: Vec<WaitCondition>,
    broken_scrolling: bool,
    broken_source: bool,
    slow_clicks: Vec<String>,
    scrolls_in_state: usize,
    pub navigations: Vec<WaitCondition>,
    pub clicks: Vec<String>,
    pub escapes: usize,
    pub scrolls: usize,
    pub visited: Vec<String>,
}

impl ScriptedDriver {
    pub fn new(initial: &str, html: impl Into<String>) -> Self {
        let mut pages = HashMap::new();
        pages.insert(initial.to_string(), html.into());
        Self {
            pages,
            live_pages: HashMap::new(),
            initial: initial.to_string(),
            state: initial.to_string(),
            click_rules: Vec::new(),
            escape_rules: HashMap::new(),
            scroll_rules: Vec::new(),
            failing_waits: Vec::new(),
            broken_scrolling: false,
            broken_source: false,
            slow_clicks: Vec::new(),
            scrolls_in_state: 0,
            navigations: Vec::new(),
            clicks: Vec::new(),
            escapes: 0,
            scrolls: 0,
            visited: vec![initial.to_string()],
        }
    }

    pub fn page(mut self, name: &str, html: impl Into<String>) -> Self {
        self.pages.insert(name.to_string(), html.into());
        self
    }

    /// Clicking a control whose lowercased label contains `needle` while in
    /// `from` moves to `to`.
    pub fn on_click(mut self, from: &str, needle: &str, to: &str) -> Self {
        self.click_rules.push(ClickRule {
            from: from.to_string(),
            needle: needle.to_lowercase(),
            to: to.to_string(),
        });
        self
    }

    pub fn on_escape(mut self, from: &str, to: &str) -> Self {
        self.escape_rules.insert(from.to_string(), to.to_string());
        self
    }

    pub fn after_scrolls(mut self, from: &str, after: usize, to: &str) -> Self {
        self.scroll_rules.push(ScrollRule {
            from: from.to_string(),
            after,
            to: to.to_string(),
        });
        self
    }

    pub fn failing_wait(mut self, wait: WaitCondition) -> Self {
        self.failing_waits.push(wait);
        self
    }

    pub fn broken_scrolling(mut self) -> Self {
        self.broken_scrolling = true;
        self
    }

    /// Element lookups in `state` see `html` while `page_source` keeps
    /// serving the page registered for it.
    pub fn live_page(mut self, state: &str, html: impl Into<String>) -> Self {
        self.live_pages.insert(state.to_string(), html.into());
        self
    }

    pub fn broken_page_source(mut self) -> Self {
        self.broken_source = true;
        self
    }

    /// Clicks on a label containing `needle` report a timeout after the
    /// transition already happened.
    pub fn slow_click(mut self, needle: &str) -> Self {
        self.slow_clicks.push(needle.to_lowercase());
        self
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    fn enter(&mut self, state: String) {
        self.visited.push(state.clone());
        self.state = state;
        self.scrolls_in_state = 0;
    }

    fn document(&self) -> Html {
        let html = self
            .live_pages
            .get(&self.state)
            .or_else(|| self.pages.get(&self.state))
            .map(String::as_str)
            .unwrap_or_default();
        Html::parse_document(html)
    }
}

fn stale(id: &ElementId) -> DriverError {
    DriverError::StaleElement(format!("element {} is not attached", id.0))
}

fn selector(css: &str) -> DriverResult<Selector> {
    Selector::parse(css).map_err(|e| DriverError::Protocol {
        name: "invalid selector".to_string(),
        message: format!("{css}: {e:?}"),
    })
}

/// Child-index path from the document root, stable across states that share
/// the same layout.
fn path_of(el: ElementRef<'_>) -> String {
    let mut steps = Vec::new();
    let mut node = *el;
    while let Some(parent) = node.parent() {
        steps.push(node.prev_siblings().count().to_string());
        node = parent;
    }
    steps.reverse();
    steps.join("/")
}

fn resolve<'a>(doc: &'a Html, id: &ElementId) -> DriverResult<ElementRef<'a>> {
    let mut node = doc.tree.root();
    for step in id.0.split('/') {
        let idx = step.parse::<usize>().map_err(|_| stale(id))?;
        node = node.children().nth(idx).ok_or_else(|| stale(id))?;
    }
    ElementRef::wrap(node).ok_or_else(|| stale(id))
}

fn label_of(el: ElementRef<'_>) -> String {
    let text = el.text().collect::<String>();
    let aria = el.value().attr("aria-label").unwrap_or_default();
    format!("{} {}", text.trim(), aria.trim()).to_lowercase()
}

impl PageDriver for ScriptedDriver {
    async fn navigate(&mut self, _url: &str, wait: WaitCondition) -> DriverResult<()> {
        self.navigations.push(wait);
        if self.failing_waits.contains(&wait) {
            return Err(DriverError::Timeout {
                action: "page load",
                millis: 30_000,
            });
        }
        let initial = self.initial.clone();
        self.enter(initial);
        Ok(())
    }

    async fn find_all(&mut self, css: &str) -> DriverResult<Vec<ElementId>> {
        let sel = selector(css)?;
        let doc = self.document();
        Ok(doc.select(&sel).map(|el| ElementId(path_of(el))).collect())
    }

    async fn find_within(&mut self, parent: &ElementId, css: &str) -> DriverResult<Vec<ElementId>> {
        let sel = selector(css)?;
        let doc = self.document();
        let scope = resolve(&doc, parent)?;
        Ok(scope.select(&sel).map(|el| ElementId(path_of(el))).collect())
    }

    async fn text(&mut self, element: &ElementId) -> DriverResult<String> {
        let doc = self.document();
        Ok(resolve(&doc, element)?.text().collect())
    }

    async fn attribute(&mut self, element: &ElementId, name: &str) -> DriverResult<Option<String>> {
        let doc = self.document();
        Ok(resolve(&doc, element)?.value().attr(name).map(str::to_string))
    }

    async fn outer_html(&mut self, element: &ElementId) -> DriverResult<String> {
        let doc = self.document();
        Ok(resolve(&doc, element)?.html())
    }

    async fn is_displayed(&mut self, element: &ElementId) -> DriverResult<bool> {
        let doc = self.document();
        let el = resolve(&doc, element)?;
        let hidden = el.value().attr("hidden").is_some()
            || el
                .value()
                .attr("style")
                .is_some_and(|style| style.replace(' ', "").contains("display:none"));
        Ok(!hidden)
    }

    async fn click(&mut self, element: &ElementId, timeout: Duration) -> DriverResult<()> {
        let label = {
            let doc = self.document();
            label_of(resolve(&doc, element)?)
        };
        self.clicks.push(label.clone());
        let next = self
            .click_rules
            .iter()
            .find(|rule| rule.from == self.state && label.contains(&rule.needle))
            .map(|rule| rule.to.clone());
        if let Some(next) = next {
            self.enter(next);
        }
        if self.slow_clicks.iter().any(|needle| label.contains(needle)) {
            return Err(DriverError::Timeout {
                action: "click",
                millis: timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    async fn scroll_by(&mut self, _dx: i64, _dy: i64) -> DriverResult<()> {
        if self.broken_scrolling {
            return Err(DriverError::Protocol {
                name: "javascript error".to_string(),
                message: "scroll target detached".to_string(),
            });
        }
        self.scrolls += 1;
        self.scrolls_in_state += 1;
        let next = self
            .scroll_rules
            .iter()
            .find(|rule| rule.from == self.state && self.scrolls_in_state >= rule.after)
            .map(|rule| rule.to.clone());
        if let Some(next) = next {
            self.enter(next);
        }
        Ok(())
    }

    async fn press_key(&mut self, key: Key) -> DriverResult<()> {
        match key {
            Key::Escape => {
                self.escapes += 1;
                if let Some(next) = self.escape_rules.get(&self.state).cloned() {
                    self.enter(next);
                }
            }
        }
        Ok(())
    }

    async fn title(&mut self) -> DriverResult<String> {
        let doc = self.document();
        let sel = selector("title")?;
        Ok(doc
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default())
    }

    async fn page_source(&mut self) -> DriverResult<String> {
        if self.broken_source {
            return Err(DriverError::Transport("connection reset by peer".to_string()));
        }
        Ok(self.pages.get(&self.state).cloned().unwrap_or_default())
    }

    async fn screenshot_png(&mut self) -> DriverResult<Vec<u8>> {
        Ok(PNG_MAGIC.to_vec())
    }
}

pub const PLACE_HEADER: &str = "Mekan_Adi,Puan,Yorum_Sayisi,Adres,Telefon,Web_Sitesi,Kategori,Fiyat_Seviyesi,Calisma_Saatleri";
pub const REVIEWS_HEADER: &str = "Kullanici,Tarih,Puan,Yorum";

pub fn document(title: &str, body: &str) -> String {
    format!("<html><head><title>{title}</title></head><body>{body}</body></html>")
}

pub fn tabs() -> &'static str {
    r#"<div role="tablist">
        <button role="tab" data-tab-index="0" aria-label="Çiya Sofrası hakkında genel bakış">Genel Bakış</button>
        <button role="tab" data-tab-index="1" aria-label="Çiya Sofrası yorumları">Yorumlar</button>
      </div>"#
}

pub fn listing_details() -> &'static str {
    r#"<div role="main">
        <h1 class="DUwDvf">Çiya Sofrası</h1>
        <div class="F7nice"><span aria-hidden="true">4,6</span>
          <span class="UY7F9">(5.120 yorum)</span></div>
        <button jsaction="pane.rating.category"><span>Anadolu restoranı</span></button>
        <span class="mgr77e">₺₺</span>
        <button data-item-id="address">Caferağa, Güneşli Bahçe Sok. No:43, 34710 Kadıköy/İstanbul</button>
        <button data-item-id="phone:tel:02163303190">0216 330 31 90</button>
        <button data-item-id="oh" aria-label="Çalışma saatleri">Açık · 22:00'de kapanıyor</button>
        <a data-item-id="authority" href="http://www.ciya.com.tr/">ciya.com.tr</a>
      </div>"#
}

pub fn overview_page() -> String {
    document(
        "Çiya Sofrası - Google Haritalar",
        &format!("{}{}", tabs(), listing_details()),
    )
}

/// Weekly hours dialog mixing both languages' day names, Sunday first.
pub fn hours_dialog() -> &'static str {
    r#"<div role="dialog" aria-label="Çalışma saatleri"><table>
        <tr><td>Sunday</td><td>12:00–21:00</td></tr>
        <tr><td>Pazartesi</td><td>11:00–22:00</td></tr>
        <tr><td>Tuesday</td><td>11:00–22:00</td></tr>
        <tr><td>Çarşamba</td><td>11:00–22:00</td></tr>
        <tr><td>Thursday</td><td>11:00–22:00</td></tr>
        <tr><td>Cuma</td><td>11:00–23:00</td></tr>
        <tr><td>Saturday</td><td>11:00–23:00</td></tr>
      </table></div>"#
}

pub const CANONICAL_HOURS: &str = "Pazartesi: 11:00–22:00\n\
    Salı: 11:00–22:00\n\
    Çarşamba: 11:00–22:00\n\
    Perşembe: 11:00–22:00\n\
    Cuma: 11:00–23:00\n\
    Cumartesi: 11:00–23:00\n\
    Pazar: 12:00–21:00";

pub fn hours_page() -> String {
    document(
        "Çiya Sofrası - Google Haritalar",
        &format!("{}{}{}", tabs(), listing_details(), hours_dialog()),
    )
}

pub fn consent_page() -> String {
    document(
        "Google Haritalar",
        r#"<form action="https://consent.google.com/save">
             <button aria-label="Tümünü reddet">Tümünü reddet</button>
             <button aria-label="Tümünü kabul et">Tümünü kabul et</button>
           </form>"#,
    )
}

pub fn review_body(n: usize) -> String {
    format!(
        "Ziyaret {n}: mercimek köftesi ve içli köfte harikaydı, servis hızlı ve güler yüzlüydü, kesinlikle tekrar geleceğiz"
    )
}

pub fn review_node(name: &str, body: &str) -> String {
    format!(
        r#"<div class="jftiEf" data-review-id="{name}">
             <a href="https://www.google.com/maps/contrib/1">{name}</a>
             <div class="RfnDt"><span>Yerel Rehber · Düzey 5</span><span>120 yorum · 48 fotoğraf</span></div>
             <span class="kvMYJc" role="img" aria-label="5 yıldız"></span>
             <span class="rsqaWe">3 hafta önce</span>
             <div class="MyEned"><span class="wiI7pd">{body}</span></div>
           </div>"#
    )
}

pub fn reviewer(n: usize) -> String {
    format!("Yorumcu {n}")
}

pub fn review_nodes(range: std::ops::Range<usize>) -> String {
    range
        .map(|n| review_node(&reviewer(n), &review_body(n)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn sort_button() -> &'static str {
    r#"<button aria-label="Yorumları sırala" jsaction="pane.review.sort">Sırala</button>"#
}

pub fn sort_menu(entries: &[&str]) -> String {
    let items = entries
        .iter()
        .map(|entry| format!(r#"<div role="menuitemradio">{entry}</div>"#))
        .collect::<String>();
    format!(r#"<div role="menu">{items}</div>"#)
}

/// Reviews tab with the sort control, an optional open menu and `nodes`.
pub fn reviews_page(menu: Option<&str>, nodes: &str) -> String {
    document(
        "Çiya Sofrası - Google Haritalar",
        &format!(
            r#"{}{}<div class="m6QErb" role="feed">{}</div>{}"#,
            tabs(),
            sort_button(),
            nodes,
            menu.unwrap_or_default()
        ),
    )
}
