//! Per-run output directory and everything written into it.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::driver::PageDriver;
use crate::error::Result;
use crate::lexicon::Lexicon;
use crate::place::{PlaceRecord, Provenance};
use crate::reviews::{HarvestOutcome, ReviewRecord};

pub const PLACE_CSV: &str = "genel_bilgiler.csv";
pub const REVIEWS_CSV: &str = "yorumlar.csv";
pub const MAIN_PAGE_PNG: &str = "main_page.png";
pub const REVIEWS_TAB_PNG: &str = "reviews_tab.png";
pub const FINAL_PNG: &str = "ekran_goruntusu_son.png";
pub const PAGE_SOURCE_HTML: &str = "page_source.html";
pub const SUMMARY_JSON: &str = "sonuc.json";

/// `<root>/<slug(place name)>_<session id>/`, created on construction.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    pub fn create(root: &Path, place_name: &str, session_id: &str, lexicon: &Lexicon) -> io::Result<Self> {
        let mut slug = slugify(place_name);
        if slug.is_empty() {
            slug = slugify(lexicon.sentinels.unknown_place);
        }
        let path = root.join(format!("{slug}_{session_id}"));
        fs::create_dir_all(&path)?;
        info!(path = %path.display(), "output directory ready");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

fn transliterate(c: char) -> Option<&'static str> {
    let ascii = match c {
        'ç' | 'Ç' => "c",
        'ğ' | 'Ğ' => "g",
        'ı' | 'İ' | 'î' | 'Î' | 'í' | 'Í' | 'ì' | 'ï' => "i",
        'ö' | 'Ö' | 'ó' | 'ò' | 'ô' | 'õ' | 'ø' => "o",
        'ş' | 'Ş' | 'ß' => "s",
        'ü' | 'Ü' | 'û' | 'Û' | 'ú' | 'ù' => "u",
        'â' | 'Â' | 'á' | 'à' | 'ä' | 'ã' | 'å' | 'Ä' => "a",
        'é' | 'É' | 'è' | 'ê' | 'ë' => "e",
        'ñ' | 'Ñ' => "n",
        'æ' => "ae",
        '&' => "and",
        _ => return None,
    };
    Some(ascii)
}

/// Lowercase ASCII words joined by `-`; Turkish and common Latin letters are
/// transliterated, everything else separates words.
pub fn slugify(input: &str) -> String {
    let mut ascii = String::with_capacity(input.len());
    for c in input.chars() {
        match transliterate(c) {
            Some(replacement) => ascii.push_str(replacement),
            None if c.is_ascii_alphanumeric() => ascii.push(c.to_ascii_lowercase()),
            None => ascii.push(' '),
        }
    }
    ascii.split_whitespace().collect::<Vec<_>>().join("-")
}

#[derive(Serialize)]
struct ReviewRow<'a> {
    #[serde(rename = "Kullanici")]
    reviewer: &'a str,
    #[serde(rename = "Tarih")]
    date: &'a str,
    #[serde(rename = "Puan")]
    rating: &'a str,
    #[serde(rename = "Yorum")]
    text: &'a str,
}

impl<'a> From<&'a ReviewRecord> for ReviewRow<'a> {
    fn from(record: &'a ReviewRecord) -> Self {
        Self {
            reviewer: &record.reviewer,
            date: &record.date,
            rating: &record.rating,
            text: &record.text,
        }
    }
}

pub fn write_place_csv(dir: &OutputDir, place: &PlaceRecord) -> Result<PathBuf> {
    let path = dir.file(PLACE_CSV);
    let mut writer = csv::Writer::from_writer(File::create(&path)?);
    writer.serialize(place)?;
    writer.flush()?;
    info!(path = %path.display(), "place details saved");
    Ok(path)
}

pub fn write_reviews_csv(dir: &OutputDir, reviews: &[ReviewRecord]) -> Result<PathBuf> {
    let path = dir.file(REVIEWS_CSV);
    let mut writer = csv::Writer::from_writer(File::create(&path)?);
    for review in reviews {
        writer.serialize(ReviewRow::from(review))?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = reviews.len(), "reviews saved");
    Ok(path)
}

/// Everything a run produced, as written to `sonuc.json`.
#[derive(Serialize)]
pub struct RunSummary<'a> {
    pub session_id: &'a str,
    pub url: &'a str,
    pub generated_at: String,
    pub output_dir: String,
    pub place: &'a PlaceRecord,
    pub provenance: &'a Provenance,
    pub reviews: &'a HarvestOutcome,
}

impl<'a> RunSummary<'a> {
    pub fn new(
        session_id: &'a str,
        url: &'a str,
        dir: &OutputDir,
        place: &'a PlaceRecord,
        provenance: &'a Provenance,
        reviews: &'a HarvestOutcome,
    ) -> Self {
        Self {
            session_id,
            url,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            output_dir: dir.path().display().to_string(),
            place,
            provenance,
            reviews,
        }
    }
}

pub fn write_summary_json(dir: &OutputDir, summary: &RunSummary<'_>) -> Result<PathBuf> {
    let path = dir.file(SUMMARY_JSON);
    let mut file = File::create(&path)?;
    serde_json::to_writer_pretty(&mut file, summary)?;
    file.write_all(b"\n")?;
    file.flush()?;
    info!(path = %path.display(), "summary saved");
    Ok(path)
}

/// Screenshots are diagnostics; failures are logged and ignored.
pub async fn save_screenshot<D: PageDriver>(driver: &mut D, dir: &OutputDir, name: &str) {
    let path = dir.file(name);
    let bytes = match driver.screenshot_png().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(file = name, error = %err, "screenshot failed");
            return;
        }
    };
    if let Err(err) = fs::write(&path, bytes) {
        warn!(path = %path.display(), error = %err, "screenshot not written");
    }
}

pub fn save_page_source(dir: &OutputDir, source: &str) {
    let path = dir.file(PAGE_SOURCE_HTML);
    match fs::write(&path, source) {
        Ok(()) => info!(path = %path.display(), "page source saved"),
        Err(err) => warn!(path = %path.display(), error = %err, "page source not written"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::TURKISH;

    #[test]
    fn slugs_transliterate_turkish() {
        assert_eq!(slugify("Çiya Sofrası"), "ciya-sofrasi");
        assert_eq!(slugify("Köfteci Ramiz - Şişli"), "kofteci-ramiz-sisli");
        assert_eq!(slugify("  İskender & Döner!! "), "iskender-and-doner");
        assert_eq!(slugify("Bilinmeyen_Mekan"), "bilinmeyen-mekan");
        assert_eq!(slugify("☕"), "");
    }

    #[test]
    fn output_dir_joins_slug_and_session() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = OutputDir::create(root.path(), "Çiya Sofrası", "ab12cd34", &TURKISH).expect("dir");
        assert_eq!(dir.path(), root.path().join("ciya-sofrasi_ab12cd34"));
        assert!(dir.path().is_dir());

        let dir = OutputDir::create(root.path(), "☕☕", "zz99zz99", &TURKISH).expect("dir");
        assert!(dir.path().ends_with("bilinmeyen-mekan_zz99zz99"));
    }

    #[test]
    fn review_csv_has_four_turkish_columns() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = OutputDir::create(root.path(), "Mekan", "s1", &TURKISH).expect("dir");
        let reviews = vec![ReviewRecord::no_reviews(&TURKISH)];
        let path = write_reviews_csv(&dir, &reviews).expect("write");
        let text = fs::read_to_string(path).expect("read");
        assert_eq!(text, "Kullanici,Tarih,Puan,Yorum\nYorum bulunamadı,,,Yorumlar çekilemedi\n");
    }
}
