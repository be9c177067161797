//! Opening-hours text parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::lexicon::{self, Lexicon};
use crate::snapshot::normalize_text;

const MAX_DAY_VALUE_CHARS: usize = 60;

static DAY_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let names = lexicon::day_names_longest_first()
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)({names})")).ok()
});

static TODAY_RANGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let today = lexicon::keywords(|l| l.today)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?i)(?:{today})[^\n]{{0,80}}?(\d{{1,2}}[:.]\d{{2}})[^\n]{{0,40}}?[-–][^\n]{{0,40}}?(\d{{1,2}}[:.]\d{{2}})"
    ))
    .ok()
});

static THROUGH_LAST_TIME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.*\d{1,2}[:.]\d{2})").ok());

/// `Bugün: 09:00 - 18:00` from an inline "today" phrase.
pub fn today_hours(text: &str, lexicon: &Lexicon) -> Option<String> {
    let caps = TODAY_RANGE.as_ref()?.captures(text)?;
    Some(format!(
        "{}: {} - {}",
        lexicon.today_label,
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str()
    ))
}

/// Parses `Day: hours` pairs written with either language's day names into
/// one line per day, Monday first, day names in `lexicon`'s language.
/// Returns `None` when no pair could be read.
pub fn parse_week(text: &str, lexicon: &Lexicon) -> Option<String> {
    let re = DAY_NAME.as_ref()?;
    let matches = re.find_iter(text).collect::<Vec<_>>();
    let mut week: [Option<String>; 7] = Default::default();

    for (i, m) in matches.iter().enumerate() {
        let Some(day) = lexicon::day_index(m.as_str()) else {
            continue;
        };
        let end = matches.get(i + 1).map(|next| next.start()).unwrap_or(text.len());
        if let Some(value) = day_value(&text[m.end()..end]) {
            week[day] = Some(value);
        }
    }

    let lines = week
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| {
            value
                .as_ref()
                .map(|v| format!("{}: {}", lexicon.days[idx], v))
        })
        .collect::<Vec<_>>();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn day_value(segment: &str) -> Option<String> {
    let line = segment.split('\n').next().unwrap_or_default();
    let line = line.trim_start_matches(|c: char| c == ':' || c.is_whitespace());
    let mut value = normalize_text(line);
    let clipped = THROUGH_LAST_TIME
        .as_ref()
        .and_then(|re| re.captures(&value))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    if let Some(clipped) = clipped {
        value = clipped;
    }
    let value = value
        .trim_end_matches(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .chars()
        .take(MAX_DAY_VALUE_CHARS)
        .collect::<String>();
    if value.is_empty() { None } else { Some(value) }
}

/// Raw hours text with whitespace collapsed and each day name starting a new
/// line.
pub fn format_raw_hours(text: &str) -> String {
    let collapsed = normalize_text(text);
    let Some(re) = DAY_NAME.as_ref() else {
        return collapsed;
    };
    re.replace_all(&collapsed, "\n$1")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{ENGLISH, TURKISH};

    const CANONICAL_WEEK: &str = "Pazartesi: 09:00–18:00\n\
        Salı: 09:00–18:00\n\
        Çarşamba: 09:00–18:00\n\
        Perşembe: 09:00–18:00\n\
        Cuma: 09:00–18:00\n\
        Cumartesi: 10:00–16:00\n\
        Pazar: Kapalı";

    #[test]
    fn turkish_panel_parses_in_order() {
        let panel = "Pazartesi: 09:00–18:00\nSalı: 09:00–18:00\nÇarşamba: 09:00–18:00\n\
            Perşembe: 09:00–18:00\nCuma: 09:00–18:00\nCumartesi: 10:00–16:00\nPazar: Kapalı";
        assert_eq!(parse_week(panel, &TURKISH).as_deref(), Some(CANONICAL_WEEK));
    }

    #[test]
    fn mixed_language_panel_is_normalized_and_reordered() {
        let panel = "Sunday: Kapalı\nPazartesi: 09:00–18:00\nTuesday: 09:00–18:00\n\
            Çarşamba: 09:00–18:00\nThursday: 09:00–18:00\nCuma: 09:00–18:00\n\
            Saturday: 10:00–16:00";
        assert_eq!(parse_week(panel, &TURKISH).as_deref(), Some(CANONICAL_WEEK));
    }

    #[test]
    fn concatenated_text_content_still_splits_per_day() {
        let panel = "Pazartesi09:00–18:00Salı09:00–18:00Saatleri önerin";
        assert_eq!(
            parse_week(panel, &TURKISH).as_deref(),
            Some("Pazartesi: 09:00–18:00\nSalı: 09:00–18:00")
        );
    }

    #[test]
    fn english_output_uses_english_day_names() {
        let panel = "Pazartesi: 08:00–22:00\nSalı: 08:00–22:00";
        assert_eq!(
            parse_week(panel, &ENGLISH).as_deref(),
            Some("Monday: 08:00–22:00\nTuesday: 08:00–22:00")
        );
    }

    #[test]
    fn panel_without_pairs_is_rejected() {
        assert_eq!(parse_week("Çalışma saatleri", &TURKISH), None);
        assert_eq!(parse_week("Pazartesi:", &TURKISH), None);
    }

    #[test]
    fn today_phrase_is_read() {
        assert_eq!(
            today_hours("Bugün · 09:00 – 22:30 · Açık", &TURKISH).as_deref(),
            Some("Bugün: 09:00 - 22:30")
        );
        assert_eq!(
            today_hours("Open today 9.30-17.00", &ENGLISH).as_deref(),
            Some("Today: 9.30 - 17.00")
        );
        assert_eq!(today_hours("Açık · Kapanış 23:00", &TURKISH), None);
    }

    #[test]
    fn raw_hours_get_one_day_per_line() {
        assert_eq!(
            format_raw_hours("Pazartesi 24 saat açık   Salı 24 saat açık"),
            "Pazartesi 24 saat açık\nSalı 24 saat açık"
        );
    }
}
