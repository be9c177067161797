//! Strategy chains for the place metadata fields.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use url::Url;

use super::hours;
use super::{Field, FieldChain, Reveal, Step, TextBounds};
use crate::lexicon::{self, Lexicon};
use crate::snapshot::{PageSnapshot, char_len, looks_like_url, normalize_text, raw_text, select_in};

const NAME_SELECTORS: &[&str] = &[
    "h1.DUwDvf",
    "h1",
    "[role=\"main\"] h1",
    "header h1",
    "div[role=\"main\"] div[role=\"heading\"]",
    "div.fontHeadlineLarge",
    "div.tAiQdd",
    "div.kSQYJe",
    "div[data-attrid] span",
];

const RATING_SELECTORS: &[&str] = &[
    "span.fontDisplayLarge",
    "div.F7nice",
    "span.ceNzKf",
    "span[aria-hidden=\"true\"]",
    "[role=\"img\"][aria-label*=\"yıldız\"]",
    "[aria-label*=\"yıldız\"]",
    "div[role=\"img\"]",
];

const STAR_LABEL_SELECTORS: &[&str] = &[
    "[aria-label*=\"stars\"]",
    "[aria-label*=\"star\"]",
    "[aria-label*=\"yıldız\"]",
    "[role=\"img\"][aria-label]",
];

const REVIEW_COUNT_SELECTORS: &[&str] = &[
    "div.fontBodyMedium span",
    "span.UY7F9",
    "button[data-tab-index=\"1\"] div",
    "span",
    "span.F7nice",
];

const CATEGORY_SELECTORS: &[&str] = &[
    "button[jsaction*=\"category\"] span",
    "button[jsaction*=\"category\"]",
    "div[jsaction*=\"category\"]",
    "span.DkEaL",
    "span[jstcache*=\"category\"]",
    "div.fontBodyMedium span",
    "span.YhemCb",
];

const ADDRESS_SELECTORS: &[&str] = &[
    "button[data-item-id=\"address\"]",
    "button[aria-label*=\"Adres\"]",
    "button[aria-label*=\"adres\"]",
    "button[aria-label*=\"ddress\"]",
    "button[data-tooltip=\"Adresi kopyala\"]",
    "button[data-tooltip=\"Copy address\"]",
    "button[jsaction*=\"si_address\"]",
    "div[jsaction*=\"si_address\"]",
];

const ADDRESS_TRIGGERS: &[&str] = &["button[jsaction*=\"address\"]", "button"];

const PHONE_SELECTORS: &[&str] = &[
    "button[data-tooltip=\"Telefon numarasını kopyala\"]",
    "button[data-tooltip=\"Copy phone number\"]",
    "button[data-item-id^=\"phone\"]",
    "button[aria-label*=\"elefon\"]",
    "button[aria-label*=\"hone\"]",
    "button[jsaction*=\"phone\"]",
    "div[jsaction*=\"phone\"]",
];

const PHONE_TRIGGERS: &[&str] = &["button[jsaction*=\"phone\"]", "button"];

const DIALOG_TEXT: &str = "div[role=\"dialog\"] div";

const WEBSITE_SELECTORS: &[&str] = &[
    "a[data-tooltip=\"Web sitesi\"]",
    "a[data-tooltip=\"Open website\"]",
    "a[data-item-id=\"authority\"]",
    "a[aria-label*=\"web\"]",
    "a[aria-label*=\"Web\"]",
    "a[jsaction*=\"website\"]",
    "div[jsaction*=\"website\"] a",
    "a[href^=\"http\"]",
];

const TRANSLATION_HOST: &str = "translate.google.com";

const PRICE_SYMBOL_SELECTORS: &[&str] = &[
    "span.mgr77e",
    "span[aria-label*=\"iyat\"]",
    "span[aria-label*=\"rice\"]",
    "div[jsaction*=\"price\"]",
    "span[class*=\"price\"]",
    "span",
];

const CURRENCY_SYMBOLS: &[char] = &['₺', '$', '€', '£'];

const HOURS_TRIGGERS: &[&str] = &[
    "button[data-item-id=\"oh\"]",
    "button[aria-label*=\"saat\"]",
    "button[aria-label*=\"ours\"]",
    "button[jsaction*=\"hours\"]",
    "div[jsaction*=\"hours\"]",
    "button",
];

const HOURS_PANELS: &[&str] = &[
    "div[role=\"dialog\"]",
    "div.m6QErb.tLjsW.eKbjU",
    "table[class*=\"WgFkxc\"]",
    "div[aria-label*=\"Çalışma saatleri\"]",
    "div[aria-label*=\"ours\"]",
    "div.OMl5r",
    "div[role=\"dialog\"] table",
    "div[jsaction*=\"modal\"]",
];

const HOURS_SECTIONS: &[&str] = &[
    "table",
    "div[class*=\"hour\"]",
    "div[jslog*=\"hours\"]",
    "div[aria-label*=\"saat\"]",
    "div[aria-label*=\"ours\"]",
];

static SERVICE_SUFFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\s*-\s*Google (Haritalar|Maps)$").ok());

static STAR_LABEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let words = lexicon::keywords(|l| l.star_words)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(\d[.,]\d|\d)\s*({words})")).ok()
});

static OUT_OF_FIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    lexicon::keywords(|l| l.out_of_five)
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

static TITLE_RATING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d[.,]\d|\d)\s*\(").ok());

static BARE_RATING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d[.,]\d|[1-5])$").ok());

static DIGITS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+").ok());

static PRICE_RANGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[₺$€£]{1,4}\s*[-–]\s*[₺$€£]{1,4}").ok());

pub fn detail_chains() -> Vec<FieldChain> {
    vec![
        category_chain(),
        rating_chain(),
        review_count_chain(),
        address_chain(),
        phone_chain(),
        price_chain(),
        hours_chain(),
        website_chain(),
    ]
}

#[cfg(test)]
pub fn chain_for(field: Field) -> FieldChain {
    match field {
        Field::Name => name_chain(),
        Field::Rating => rating_chain(),
        Field::ReviewCount => review_count_chain(),
        Field::Address => address_chain(),
        Field::Phone => phone_chain(),
        Field::Website => website_chain(),
        Field::Category => category_chain(),
        Field::PriceTier => price_chain(),
        Field::Hours => hours_chain(),
    }
}

fn texts<'a>(snap: &'a PageSnapshot, css: &str) -> impl Iterator<Item = (ElementRef<'a>, String)> {
    snap.select(css).into_iter().map(|el| (el, raw_text(el)))
}

fn first_text(
    snap: &PageSnapshot,
    selectors: &[&str],
    accept: impl Fn(ElementRef<'_>, &str) -> bool,
) -> Option<String> {
    selectors.iter().find_map(|css| {
        texts(snap, css)
            .find(|(el, text)| accept(*el, text))
            .map(|(_, text)| text)
    })
}

pub fn name_chain() -> FieldChain {
    FieldChain {
        field: Field::Name,
        bounds: TextBounds::new(3, 99),
        steps: vec![
            Step::scan("headline", name_from_headline),
            Step::scan("document_title", name_from_title),
            Step::scan("og_title", name_from_og_title),
            Step::scan("any_heading", name_from_any_heading),
        ],
    }
}

fn plausible_name(text: &str) -> bool {
    let len = char_len(text);
    (3..100).contains(&len) && !looks_like_url(text)
}

pub fn strip_service_suffix(text: &str) -> String {
    match SERVICE_SUFFIX.as_ref() {
        Some(re) => re.replace(text.trim(), "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn name_from_headline(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    first_text(snap, NAME_SELECTORS, |el, text| {
        plausible_name(text) && select_in(el, "a").is_empty()
    })
    .map(|name| strip_service_suffix(&name))
}

fn name_from_title(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    let (head, _) = snap.title().split_once(" - ")?;
    Some(head.trim().to_string())
}

fn name_from_og_title(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    snap.meta_content("meta[property=\"og:title\"]")
        .map(|title| strip_service_suffix(&title))
}

fn name_from_any_heading(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    first_text(snap, &["h1, [role=\"heading\"][aria-level=\"1\"]"], |_, text| {
        (3..100).contains(&char_len(text))
    })
    .map(|name| strip_service_suffix(&name))
}

pub fn rating_chain() -> FieldChain {
    FieldChain {
        field: Field::Rating,
        bounds: TextBounds::new(3, 3),
        steps: vec![
            Step::scan("headline_number", rating_from_headline),
            Step::scan("star_label", rating_from_star_label),
            Step::scan("out_of_five", rating_from_out_of_five),
            Step::scan("document_title", rating_from_title),
            Step::scan("bare_number", rating_from_bare_text),
        ],
    }
}

/// `4,5` -> `4.5`, `4` -> `4.0`; anything outside 1..=5 is rejected.
pub fn normalize_rating(raw: &str) -> Option<String> {
    let mut text = raw.trim().replace(',', ".");
    if text.len() == 1 && text.chars().all(|c| c.is_ascii_digit()) {
        text.push_str(".0");
    }
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 3
        && bytes[0].is_ascii_digit()
        && bytes[1] == b'.'
        && bytes[2].is_ascii_digit();
    if !shaped {
        return None;
    }
    let value = text.parse::<f32>().ok()?;
    (1.0..=5.0).contains(&value).then_some(text)
}

fn rating_from_headline(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    RATING_SELECTORS.iter().find_map(|css| {
        texts(snap, css).find_map(|(_, text)| {
            let short = !text.is_empty() && char_len(&text) < 5;
            if short && text.chars().any(|c| ('1'..='5').contains(&c)) {
                normalize_rating(&text)
            } else {
                None
            }
        })
    })
}

fn rating_from_star_label(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    let re = STAR_LABEL.as_ref()?;
    STAR_LABEL_SELECTORS.iter().find_map(|css| {
        snap.select(css).into_iter().find_map(|el| {
            let label = el.value().attr("aria-label")?.to_lowercase();
            let caps = re.captures(&label)?;
            normalize_rating(caps.get(1)?.as_str())
        })
    })
}

fn rating_from_out_of_five(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    let text = snap.body_text();
    OUT_OF_FIVE.iter().find_map(|re| {
        let caps = re.captures(&text)?;
        normalize_rating(caps.get(1)?.as_str())
    })
}

fn rating_from_title(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    let caps = TITLE_RATING.as_ref()?.captures(snap.title())?;
    normalize_rating(caps.get(1)?.as_str())
}

fn rating_from_bare_text(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    let re = BARE_RATING.as_ref()?;
    texts(snap, "span, div")
        .filter(|(_, text)| re.is_match(text))
        .find_map(|(_, text)| normalize_rating(&text))
}

pub fn review_count_chain() -> FieldChain {
    FieldChain {
        field: Field::ReviewCount,
        bounds: TextBounds::new(3, 40),
        steps: vec![
            Step::scan("labelled_count", review_count_from_text),
            Step::scan("aria_count", review_count_from_aria),
        ],
    }
}

pub fn review_count_digits(text: &str) -> Option<String> {
    if !text.chars().any(|c| c.is_ascii_digit()) || !lexicon::mentions(text, |l| l.review_words)
    {
        return None;
    }
    let digits = DIGITS
        .as_ref()?
        .find_iter(text)
        .map(|m| m.as_str())
        .collect::<String>();
    if digits.is_empty() { None } else { Some(digits) }
}

fn review_count_from_text(snap: &PageSnapshot, lex: &Lexicon) -> Option<String> {
    first_text(snap, REVIEW_COUNT_SELECTORS, |_, text| {
        char_len(text) < 40 && review_count_digits(text).is_some()
    })
    .and_then(|text| review_count_digits(&text))
    .map(|digits| format!("{digits} {}", lex.review_count_suffix))
}

fn review_count_from_aria(snap: &PageSnapshot, lex: &Lexicon) -> Option<String> {
    snap.select("[aria-label]")
        .into_iter()
        .filter_map(|el| el.value().attr("aria-label"))
        .filter(|label| char_len(label) < 40)
        .find_map(review_count_digits)
        .map(|digits| format!("{digits} {}", lex.review_count_suffix))
}

pub fn category_chain() -> FieldChain {
    FieldChain {
        field: Field::Category,
        bounds: TextBounds::new(3, 49),
        steps: vec![Step::scan("category_keyword", category_from_keywords)],
    }
}

fn category_from_keywords(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    first_text(snap, CATEGORY_SELECTORS, |_, text| {
        let len = char_len(text);
        len > 2
            && len < 50
            && !text.chars().any(|c| c.is_ascii_digit())
            && lexicon::mentions(text, |l| l.category_words)
    })
}

pub fn address_chain() -> FieldChain {
    FieldChain {
        field: Field::Address,
        bounds: TextBounds::new(11, 250),
        steps: vec![
            Step::scan("address_button", address_from_buttons),
            Step::Reveal(Reveal {
                name: "address_dialog",
                triggers: ADDRESS_TRIGGERS,
                accept_trigger: is_address_trigger,
                read: address_from_dialog,
            }),
        ],
    }
}

fn is_address_trigger(label: &str) -> bool {
    lexicon::mentions(label, |l| l.address_words)
}

fn address_from_buttons(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    first_text(snap, ADDRESS_SELECTORS, |_, text| char_len(text) > 10).map(|t| normalize_text(&t))
}

fn address_from_dialog(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    texts(snap, DIALOG_TEXT)
        .find(|(_, text)| char_len(text) > 15 && lexicon::mentions(text, |l| l.street_words))
        .map(|(_, text)| normalize_text(&text))
}

pub fn phone_chain() -> FieldChain {
    FieldChain {
        field: Field::Phone,
        bounds: TextBounds::new(10, 40),
        steps: vec![
            Step::scan("phone_button", phone_from_buttons),
            Step::Reveal(Reveal {
                name: "phone_dialog",
                triggers: PHONE_TRIGGERS,
                accept_trigger: is_phone_trigger,
                read: phone_from_dialog,
            }),
        ],
    }
}

fn is_phone_trigger(label: &str) -> bool {
    lexicon::mentions(label, |l| l.phone_words)
}

fn plausible_phone(text: &str) -> bool {
    (text.chars().any(|c| c.is_ascii_digit()) || text.contains('+')) && char_len(text) >= 10
}

fn phone_from_buttons(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    first_text(snap, PHONE_SELECTORS, |_, text| plausible_phone(text)).map(|t| normalize_text(&t))
}

fn phone_from_dialog(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    texts(snap, DIALOG_TEXT)
        .find(|(_, text)| text.chars().any(|c| c.is_ascii_digit()) && char_len(text) >= 10)
        .map(|(_, text)| normalize_text(&text))
}

pub fn website_chain() -> FieldChain {
    FieldChain {
        field: Field::Website,
        bounds: TextBounds::url(4, 300),
        steps: vec![Step::scan("website_link", website_from_links)],
    }
}

// the service's own hosts and the translation proxy are not the place's site
pub fn is_external_target(target: &str) -> bool {
    let target = target.trim();
    let parsed = Url::parse(target).or_else(|_| Url::parse(&format!("http://{target}")));
    let Ok(url) = parsed else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    if host == TRANSLATION_HOST || host.ends_with(&format!(".{TRANSLATION_HOST}")) {
        return false;
    }
    !is_service_host(&host)
}

fn is_service_host(host: &str) -> bool {
    let labels = host.split('.').collect::<Vec<_>>();
    labels
        .iter()
        .position(|label| *label == "google")
        .is_some_and(|idx| {
            let tail = &labels[idx + 1..];
            !tail.is_empty() && tail.len() <= 2 && tail.iter().all(|l| l.len() <= 3)
        })
}

fn text_looks_like_link(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["http", "www", ".com", ".net"].iter().any(|m| lower.contains(m))
}

fn website_from_links(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    WEBSITE_SELECTORS.iter().find_map(|css| {
        texts(snap, css).find_map(|(el, text)| {
            let href = el.value().attr("href").map(str::trim).unwrap_or_default();
            let href_is_link = href.to_lowercase().starts_with("http");
            let text_is_link = text_looks_like_link(&text);
            if !href_is_link && !text_is_link {
                return None;
            }
            let target = if href.is_empty() { text.as_str() } else { href };
            if !is_external_target(target) {
                return None;
            }
            if text_is_link {
                Some(normalize_text(&text))
            } else {
                Some(href.to_string())
            }
        })
    })
}

pub fn price_chain() -> FieldChain {
    FieldChain {
        field: Field::PriceTier,
        bounds: TextBounds::new(1, 49),
        steps: vec![
            Step::scan("per_person", price_per_person),
            Step::scan("currency_symbol", price_from_symbol),
            Step::scan("tier_keyword", price_from_tier_word),
            Step::scan("currency_range", price_from_range),
        ],
    }
}

fn price_per_person(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    let candidates = texts(snap, "span, div, button")
        .map(|(_, text)| text)
        .filter(|text| char_len(text) < 50)
        .collect::<Vec<_>>();
    lexicon::keywords(|l| l.per_person).find_map(|keyword| {
        candidates
            .iter()
            .find(|text| text.to_lowercase().contains(keyword))
            .map(|text| normalize_text(text))
    })
}

fn price_from_symbol(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    first_text(snap, PRICE_SYMBOL_SELECTORS, |_, text| {
        text.contains(CURRENCY_SYMBOLS) && char_len(text) <= 5
    })
}

fn price_from_tier_word(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    texts(snap, "span, div")
        .map(|(_, text)| text)
        .find(|text| char_len(text) < 30 && lexicon::has_word(text, |l| l.price_tiers))
        .map(|text| normalize_text(&text))
}

fn price_from_range(snap: &PageSnapshot, _: &Lexicon) -> Option<String> {
    let text = snap.body_text();
    PRICE_RANGE
        .as_ref()?
        .find(&text)
        .map(|m| m.as_str().to_string())
}

pub fn hours_chain() -> FieldChain {
    FieldChain {
        field: Field::Hours,
        bounds: TextBounds::new(5, 600),
        steps: vec![
            Step::scan("today_inline", hours_today_inline),
            Step::Reveal(Reveal {
                name: "weekly_panel",
                triggers: HOURS_TRIGGERS,
                accept_trigger: is_hours_trigger,
                read: hours_from_panel,
            }),
            Step::scan("in_page_table", hours_from_sections),
        ],
    }
}

fn is_hours_trigger(label: &str) -> bool {
    if char_len(label) > 200 {
        return false;
    }
    lexicon::mentions(label, |l| l.hours_words)
        || (label.contains(':') && (label.contains('-') || label.contains('–')))
}

fn hours_today_inline(snap: &PageSnapshot, lex: &Lexicon) -> Option<String> {
    hours::today_hours(&snap.body_text(), lex)
}

pub fn hours_from_panel(snap: &PageSnapshot, lex: &Lexicon) -> Option<String> {
    HOURS_PANELS.iter().find_map(|css| {
        let panel = snap.select(css).into_iter().next()?;
        let text = raw_text(panel);
        if !lexicon::mentions_week_start(&text) {
            return None;
        }
        hours::parse_week(&text, lex).or_else(|| Some(hours::format_raw_hours(&text)))
    })
}

fn hours_from_sections(snap: &PageSnapshot, lex: &Lexicon) -> Option<String> {
    first_text(snap, HOURS_SECTIONS, |_, text| {
        lexicon::mentions_week_start(text) && text.contains(':') && char_len(text) > 20
    })
    .map(|text| hours::parse_week(&text, lex).unwrap_or_else(|| hours::format_raw_hours(&text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{ENGLISH, TURKISH};

    fn snap(body: &str) -> PageSnapshot {
        PageSnapshot::from_html(&format!("<html><head></head><body>{body}</body></html>"))
    }

    fn value(chain: FieldChain, body: &str) -> String {
        chain.first_match(&snap(body), &TURKISH).value
    }

    #[test]
    fn rating_normalization() {
        assert_eq!(normalize_rating("4,5").as_deref(), Some("4.5"));
        assert_eq!(normalize_rating("4").as_deref(), Some("4.0"));
        assert_eq!(normalize_rating(" 3.9 ").as_deref(), Some("3.9"));
        assert_eq!(normalize_rating("7"), None);
        assert_eq!(normalize_rating("0,5"), None);
        assert_eq!(normalize_rating("(12)"), None);
    }

    #[test]
    fn rating_from_headline_number() {
        let body = r#"<div class="F7nice"><span aria-hidden="true">4,5</span></div>"#;
        assert_eq!(value(rating_chain(), body), "4.5");
    }

    #[test]
    fn bare_single_digit_rating_is_padded() {
        let body = r#"<span class="fontDisplayLarge">4</span>"#;
        assert_eq!(value(rating_chain(), body), "4.0");
    }

    #[test]
    fn out_of_range_rating_falls_back_to_sentinel() {
        let body = r#"<span class="fontDisplayLarge">7</span>
            <div role="img" aria-label="7 yıldız"></div>
            <span>7</span>"#;
        assert_eq!(value(rating_chain(), body), "Belirtilmemiş");
    }

    #[test]
    fn rating_from_star_aria_label() {
        let body = r#"<span role="img" aria-label="4,3 yıldız"></span>"#;
        assert_eq!(value(rating_chain(), body), "4.3");
    }

    #[test]
    fn rating_from_out_of_five_phrase() {
        let body = "<p>Ortalama puan 4,6 üzerinden 5</p>";
        assert_eq!(value(rating_chain(), body), "4.6");
    }

    #[test]
    fn rating_from_document_title() {
        let snap = PageSnapshot::from_html(
            "<html><head><title>Çiya Sofrası - 4,6 (5.120)</title></head><body></body></html>",
        );
        assert_eq!(rating_chain().first_match(&snap, &TURKISH).value, "4.6");
    }

    #[test]
    fn name_prefers_headline_without_links() {
        let body = r#"<h1 class="DUwDvf"><a href="/x">Link</a></h1>
            <div role="main"><h1>Çiya Sofrası</h1></div>"#;
        assert_eq!(value(name_chain(), body), "Çiya Sofrası");
    }

    #[test]
    fn name_falls_back_to_title_then_og() {
        let snap = PageSnapshot::from_html(
            "<html><head><title>Köfteci Ramiz - Google Haritalar</title></head><body></body></html>",
        );
        assert_eq!(name_chain().first_match(&snap, &TURKISH).value, "Köfteci Ramiz");

        let snap = PageSnapshot::from_html(
            r#"<html><head><meta property="og:title" content="Köfteci Ramiz - Google Maps"></head>
            <body></body></html>"#,
        );
        assert_eq!(name_chain().first_match(&snap, &TURKISH).value, "Köfteci Ramiz");
    }

    #[test]
    fn missing_name_uses_place_sentinel() {
        assert_eq!(value(name_chain(), "<p>x</p>"), "Bilinmeyen_Mekan");
        let got = name_chain().first_match(&snap("<p>x</p>"), &ENGLISH).value;
        assert_eq!(got, "Unknown_Place");
    }

    #[test]
    fn review_count_concatenates_digit_groups() {
        assert_eq!(review_count_digits("1.234 yorum").as_deref(), Some("1234"));
        assert_eq!(review_count_digits("(2,087 reviews)").as_deref(), Some("2087"));
        assert_eq!(review_count_digits("1.234"), None);
        let body = r#"<span class="UY7F9">(1.234 yorum)</span>"#;
        assert_eq!(value(review_count_chain(), body), "1234 yorum");
    }

    #[test]
    fn category_requires_keyword_and_no_digits() {
        let body = r#"<span class="DkEaL">3 restoran</span><span class="DkEaL">Kebap restoranı</span>"#;
        assert_eq!(value(category_chain(), body), "Kebap restoranı");
    }

    #[test]
    fn address_from_item_button() {
        let body = r#"<button data-item-id="address">Kuşdili Cad. No:12, Kadıköy/İstanbul</button>"#;
        assert_eq!(value(address_chain(), body), "Kuşdili Cad. No:12, Kadıköy/İstanbul");
    }

    #[test]
    fn short_phone_candidates_are_rejected() {
        let body = r#"<button data-item-id="phone:tel:0216">0216</button>
            <button data-tooltip="Telefon numarasını kopyala">0216 330 31 90</button>"#;
        assert_eq!(value(phone_chain(), body), "0216 330 31 90");
    }

    #[test]
    fn website_skips_service_and_translation_links() {
        let body = r#"<a data-item-id="authority" href="https://www.google.com/url?q=https://ciya.com.tr">ciya.com.tr</a>
            <a aria-label="web" href="https://translate.google.com/translate?u=ciya.com.tr">www.ciya.com.tr</a>
            <a href="https://ciya.com.tr/">ciya.com.tr</a>"#;
        assert_eq!(value(website_chain(), body), "ciya.com.tr");
    }

    #[test]
    fn website_uses_href_when_text_is_a_label() {
        let body = r#"<a data-tooltip="Web sitesi" href="https://lezzet.example/">Web sitesi</a>"#;
        assert_eq!(value(website_chain(), body), "https://lezzet.example/");
    }

    #[test]
    fn external_target_detection() {
        assert!(is_external_target("https://ciya.com.tr"));
        assert!(is_external_target("www.lokanta.net"));
        assert!(!is_external_target("https://www.google.com.tr/maps"));
        assert!(!is_external_target("https://maps.google.com/?cid=1"));
        assert!(!is_external_target("https://translate.google.com/?u=x"));
        assert!(is_external_target("https://googleplex-fans.example"));
    }

    #[test]
    fn price_prefers_per_person_phrase() {
        let body = r#"<span>₺₺</span><div>Kişi başı ₺400–600</div>"#;
        assert_eq!(value(price_chain(), body), "Kişi başı ₺400–600");
    }

    #[test]
    fn price_symbol_then_tier_word_then_range() {
        assert_eq!(value(price_chain(), r#"<span class="mgr77e">₺₺</span>"#), "₺₺");
        assert_eq!(value(price_chain(), "<span>Orta fiyatlı</span>"), "Orta fiyatlı");
        assert_eq!(
            value(price_chain(), "<p>Fiyat aralığı: bilgi ₺₺ – ₺₺₺ arasında değişir ve uzun bir açıklama</p>"),
            "₺₺ – ₺₺₺"
        );
        assert_eq!(value(price_chain(), "<span>Ortam güzel</span>"), "Belirtilmemiş");
    }

    #[test]
    fn hours_inline_today_wins() {
        let body = "<div>Bugün 09:00–22:00</div>";
        assert_eq!(value(hours_chain(), body), "Bugün: 09:00 - 22:00");
    }

    #[test]
    fn hours_from_in_page_table() {
        let body = "<table><tr><td>Pazartesi</td><td>09:00–18:00</td></tr>\
            <tr><td>Salı</td><td>09:00–18:00</td></tr></table>";
        assert_eq!(
            value(hours_chain(), body),
            "Pazartesi: 09:00–18:00\nSalı: 09:00–18:00"
        );
    }

    #[test]
    fn hours_panel_reader_handles_open_dialog() {
        let s = snap(
            r#"<div role="dialog">Pazartesi: 10:00–20:00
Tuesday: 10:00–20:00</div>"#,
        );
        assert_eq!(
            hours_from_panel(&s, &TURKISH).as_deref(),
            Some("Pazartesi: 10:00–20:00\nSalı: 10:00–20:00")
        );
    }

    #[test]
    fn unextractable_fields_yield_sentinels() {
        let empty = snap("<div></div>");
        for field in Field::ALL {
            let got = chain_for(field).first_match(&empty, &TURKISH);
            assert_eq!(got.value, field.sentinel(&TURKISH), "{}", field.label());
            assert!(!got.value.is_empty());
        }
    }
}
