//! Per-language keyword tables. Input matching consults every lexicon;
//! output strings come from the selected one.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Serialize)]
pub enum Language {
    Tr,
    En,
}

impl Language {
    pub fn lexicon(self) -> &'static Lexicon {
        match self {
            Language::Tr => &TURKISH,
            Language::En => &ENGLISH,
        }
    }
}

/// Output strings used where nothing could be extracted.
#[derive(Debug)]
pub struct Sentinels {
    pub unspecified: &'static str,
    pub unknown_place: &'static str,
    pub unknown_reviewer: &'static str,
    pub undated_review: &'static str,
    pub no_reviews_name: &'static str,
    pub no_reviews_text: &'static str,
    pub error_name: &'static str,
    pub error_prefix: &'static str,
}

#[derive(Debug)]
pub struct Lexicon {
    pub language: Language,
    /// Monday first.
    pub days: [&'static str; 7],
    pub today: &'static [&'static str],
    pub review_words: &'static [&'static str],
    pub star_words: &'static [&'static str],
    /// Regexes with the rating in capture group 1.
    pub out_of_five: &'static [&'static str],
    pub category_words: &'static [&'static str],
    pub address_words: &'static [&'static str],
    pub street_words: &'static [&'static str],
    pub phone_words: &'static [&'static str],
    pub hours_words: &'static [&'static str],
    pub per_person: &'static [&'static str],
    pub price_tiers: &'static [&'static str],
    pub consent: &'static [&'static str],
    pub overview_tab: &'static [&'static str],
    pub reviews_tab: &'static [&'static str],
    pub sort_control: &'static [&'static str],
    pub newest: &'static [&'static str],
    pub show_more: &'static [&'static str],
    pub time_units: &'static [&'static str],
    pub ago: &'static [&'static str],
    pub local_guide: &'static [&'static str],
    pub guide_level: &'static [&'static str],
    pub contribution_words: &'static [&'static str],
    pub photo_words: &'static [&'static str],
    pub review_count_suffix: &'static str,
    pub contributions_suffix: &'static str,
    pub photos_suffix: &'static str,
    pub level_label: &'static str,
    pub today_label: &'static str,
    pub sentinels: Sentinels,
}

pub static TURKISH: Lexicon = Lexicon {
    language: Language::Tr,
    days: [
        "Pazartesi",
        "Salı",
        "Çarşamba",
        "Perşembe",
        "Cuma",
        "Cumartesi",
        "Pazar",
    ],
    today: &["bugün"],
    review_words: &["yorum", "değerlendirme"],
    star_words: &["yıldız", "puan"],
    out_of_five: &[
        r"(\d,\d) üzerinden 5",
        r"(\d,\d)/5",
        r"5 üzerinden (\d,\d)",
    ],
    category_words: &["restoran", "kafe", "lokanta", "kebap", "meyhane", "pastane"],
    address_words: &["adres"],
    street_words: &["cadde", "cad.", "sokak", "sk.", "mah", "bulvar"],
    phone_words: &["telefon"],
    hours_words: &["saat", "açık", "kapalı", "bugün"],
    per_person: &[
        "kişi başı",
        "kişi başı fiyat",
        "kişi başı ücret",
        "kişi başı maliyet",
        "kişi başı ortalama",
    ],
    price_tiers: &["ucuz", "ekonomik", "orta", "pahalı", "lüks"],
    consent: &["tümünü kabul", "kabul"],
    overview_tab: &["genel bakış", "ana bilgiler", "genel"],
    reviews_tab: &["yorum", "değerlendirme"],
    sort_control: &["sıra", "alak", "en y"],
    newest: &["en yeni", "yeni"],
    show_more: &["daha fazla"],
    time_units: &["gün", "hafta", "ay", "yıl"],
    ago: &["önce"],
    local_guide: &["yerel rehber"],
    guide_level: &["düzey"],
    contribution_words: &["inceleme", "yorum", "değerlendirme"],
    photo_words: &["fotoğraf"],
    review_count_suffix: "yorum",
    contributions_suffix: "inceleme",
    photos_suffix: "fotoğraf",
    level_label: "Düzey",
    today_label: "Bugün",
    sentinels: Sentinels {
        unspecified: "Belirtilmemiş",
        unknown_place: "Bilinmeyen_Mekan",
        unknown_reviewer: "Bilinmeyen Kullanıcı",
        undated_review: "Yeni yorum",
        no_reviews_name: "Yorum bulunamadı",
        no_reviews_text: "Yorumlar çekilemedi",
        error_name: "Hata",
        error_prefix: "Hata",
    },
};

pub static ENGLISH: Lexicon = Lexicon {
    language: Language::En,
    days: [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ],
    today: &["today"],
    review_words: &["review"],
    star_words: &["stars", "star"],
    out_of_five: &[r"(\d\.\d) out of 5", r"(\d\.\d)/5", r"5 out of (\d\.\d)"],
    category_words: &["restaurant", "cafe", "bar", "pub", "bistro", "pizzeria", "diner", "bakery"],
    address_words: &["address"],
    street_words: &["street", "st.", "avenue", "ave", "road", "rd.", "boulevard"],
    phone_words: &["phone"],
    hours_words: &["hours", "open", "closed", "today"],
    per_person: &["per person", "per-person", "per head", "per capita", "per guest"],
    price_tiers: &["cheap", "inexpensive", "moderate", "expensive", "luxury"],
    consent: &["accept all", "accept", "agree"],
    overview_tab: &["overview"],
    reviews_tab: &["review"],
    sort_control: &["sort"],
    newest: &["newest", "most recent", "recent"],
    show_more: &["more"],
    time_units: &["day", "week", "month", "year"],
    ago: &["ago"],
    local_guide: &["local guide"],
    guide_level: &["level"],
    contribution_words: &["reviews", "review"],
    photo_words: &["photos", "photo"],
    review_count_suffix: "reviews",
    contributions_suffix: "reviews",
    photos_suffix: "photos",
    level_label: "Level",
    today_label: "Today",
    sentinels: Sentinels {
        unspecified: "Not specified",
        unknown_place: "Unknown_Place",
        unknown_reviewer: "Unknown User",
        undated_review: "Recent review",
        no_reviews_name: "No reviews found",
        no_reviews_text: "Reviews could not be collected",
        error_name: "Error",
        error_prefix: "Error",
    },
};

pub static ALL: [&Lexicon; 2] = [&TURKISH, &ENGLISH];

pub type KeywordSet = fn(&Lexicon) -> &'static [&'static str];

pub fn keywords(set: KeywordSet) -> impl Iterator<Item = &'static str> {
    ALL.iter().flat_map(move |lex| set(lex).iter().copied())
}

/// Case-insensitive substring test against one keyword kind in any language.
pub fn mentions(text: &str, set: KeywordSet) -> bool {
    let lower = text.to_lowercase();
    keywords(set).any(|kw| lower.contains(kw))
}

/// Whole-word test: some word of `text` equals a keyword.
pub fn has_word(text: &str, set: KeywordSet) -> bool {
    let lower = text.to_lowercase();
    let words = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>();
    keywords(set).any(|kw| words.contains(&kw))
}

pub fn day_index(name: &str) -> Option<usize> {
    let lower = name.trim().to_lowercase();
    ALL.iter().find_map(|lex| {
        lex.days
            .iter()
            .position(|day| day.to_lowercase() == lower)
    })
}

/// All day names, longest first so that alternations prefer `Pazartesi`
/// over `Pazar` and `Cumartesi` over `Cuma`.
pub fn day_names_longest_first() -> Vec<&'static str> {
    let mut names = ALL
        .iter()
        .flat_map(|lex| lex.days.iter().copied())
        .collect::<Vec<_>>();
    names.sort_by_key(|name| std::cmp::Reverse(name.chars().count()));
    names
}

/// Monday and Tuesday names; a text mentioning one looks like a week table.
pub fn mentions_week_start(text: &str) -> bool {
    let lower = text.to_lowercase();
    ALL.iter()
        .flat_map(|lex| lex.days[..2].iter())
        .any(|day| lower.contains(&day.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_index_accepts_both_languages() {
        assert_eq!(day_index("Pazartesi"), Some(0));
        assert_eq!(day_index("wednesday"), Some(2));
        assert_eq!(day_index(" Pazar "), Some(6));
        assert_eq!(day_index("Cumartesi"), Some(5));
        assert_eq!(day_index("Someday"), None);
    }

    #[test]
    fn longest_names_come_first() {
        let names = day_names_longest_first();
        let pazartesi = names.iter().position(|n| *n == "Pazartesi");
        let pazar = names.iter().position(|n| *n == "Pazar");
        assert!(pazartesi < pazar);
        let cumartesi = names.iter().position(|n| *n == "Cumartesi");
        let cuma = names.iter().position(|n| *n == "Cuma");
        assert!(cumartesi < cuma);
    }

    #[test]
    fn has_word_matches_whole_words_only() {
        assert!(has_word("Orta fiyatlı", |l| l.price_tiers));
        assert!(!has_word("Ortam çok güzel", |l| l.price_tiers));
        assert!(has_word("Inexpensive", |l| l.price_tiers));
    }

    #[test]
    fn mentions_is_case_insensitive() {
        assert!(mentions("1.234 Yorum", |l| l.review_words));
        assert!(mentions("87 Reviews", |l| l.review_words));
        assert!(!mentions("87", |l| l.review_words));
    }
}
