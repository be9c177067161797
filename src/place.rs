use serde::Serialize;
use tracing::info;

use crate::config::Pacing;
use crate::driver::PageDriver;
use crate::extract::fields::{self, detail_chains};
use crate::extract::{Extracted, Field};
use crate::lexicon::Lexicon;

/// One row of `genel_bilgiler.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceRecord {
    #[serde(rename = "Mekan_Adi")]
    pub name: String,
    #[serde(rename = "Puan")]
    pub rating: String,
    #[serde(rename = "Yorum_Sayisi")]
    pub review_count: String,
    #[serde(rename = "Adres")]
    pub address: String,
    #[serde(rename = "Telefon")]
    pub phone: String,
    #[serde(rename = "Web_Sitesi")]
    pub website: String,
    #[serde(rename = "Kategori")]
    pub category: String,
    #[serde(rename = "Fiyat_Seviyesi")]
    pub price_tier: String,
    #[serde(rename = "Calisma_Saatleri")]
    pub hours: String,
}

/// Which step produced each field, for the run summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Provenance {
    pub hits: Vec<(&'static str, &'static str)>,
    pub misses: Vec<&'static str>,
}

impl Provenance {
    fn record(&mut self, field: Field, extracted: &Extracted) {
        match extracted.strategy {
            Some(strategy) => self.hits.push((field.label(), strategy)),
            None => self.misses.push(field.label()),
        }
    }
}

impl PlaceRecord {
    /// Every field at its sentinel.
    pub fn placeholder(lexicon: &Lexicon) -> Self {
        let mut record = Self {
            name: String::new(),
            rating: String::new(),
            review_count: String::new(),
            address: String::new(),
            phone: String::new(),
            website: String::new(),
            category: String::new(),
            price_tier: String::new(),
            hours: String::new(),
        };
        for field in Field::ALL {
            record.set(field, field.sentinel(lexicon).to_string());
        }
        record
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Rating => &mut self.rating,
            Field::ReviewCount => &mut self.review_count,
            Field::Address => &mut self.address,
            Field::Phone => &mut self.phone,
            Field::Website => &mut self.website,
            Field::Category => &mut self.category,
            Field::PriceTier => &mut self.price_tier,
            Field::Hours => &mut self.hours,
        };
        *slot = value;
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Rating => &self.rating,
            Field::ReviewCount => &self.review_count,
            Field::Address => &self.address,
            Field::Phone => &self.phone,
            Field::Website => &self.website,
            Field::Category => &self.category,
            Field::PriceTier => &self.price_tier,
            Field::Hours => &self.hours,
        }
    }
}

pub async fn extract_name<D: PageDriver>(driver: &mut D, lexicon: &Lexicon, pacing: &Pacing) -> String {
    let extracted = fields::name_chain().resolve(driver, lexicon, pacing).await;
    info!(name = %extracted.value, "place identified");
    extracted.value
}

/// Resolves every field except the name against the live page.
pub async fn extract_details<D: PageDriver>(
    driver: &mut D,
    name: String,
    lexicon: &Lexicon,
    pacing: &Pacing,
) -> (PlaceRecord, Provenance) {
    let mut record = PlaceRecord::placeholder(lexicon);
    let mut provenance = Provenance::default();
    record.set(Field::Name, name);

    for chain in detail_chains() {
        let extracted = chain.resolve(driver, lexicon, pacing).await;
        provenance.record(chain.field, &extracted);
        record.set(chain.field, extracted.value);
    }
    info!(
        found = provenance.hits.len(),
        missing = provenance.misses.len(),
        "place details collected"
    );
    (record, provenance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{ENGLISH, TURKISH};
    use crate::snapshot::PageSnapshot;

    // pure scans only; reveal steps need a live page
    fn scan_all(snapshot: &PageSnapshot, lexicon: &Lexicon) -> PlaceRecord {
        let mut record = PlaceRecord::placeholder(lexicon);
        for field in Field::ALL {
            let extracted = fields::chain_for(field).first_match(snapshot, lexicon);
            record.set(field, extracted.value);
        }
        record
    }

    const LISTING: &str = r#"<html><head><title>Çiya Sofrası - Google Haritalar</title></head>
        <body><div role="main">
          <h1 class="DUwDvf">Çiya Sofrası</h1>
          <div class="F7nice"><span aria-hidden="true">4,6</span>
            <span class="UY7F9">(5.120 yorum)</span></div>
          <button jsaction="pane.rating.category"><span>Anadolu restoranı</span></button>
          <span class="mgr77e">₺₺</span>
          <button data-item-id="address">Caferağa, Güneşli Bahçe Sok. No:43, 34710 Kadıköy/İstanbul</button>
          <button data-item-id="phone:tel:02163303190">0216 330 31 90</button>
          <a data-item-id="authority" href="http://www.ciya.com.tr/">ciya.com.tr</a>
          <div>Açık · Bugün 11:00–22:00</div>
        </div></body></html>"#;

    #[test]
    fn listing_snapshot_fills_every_field() {
        let snap = PageSnapshot::from_html(LISTING);
        let record = scan_all(&snap, &TURKISH);
        assert_eq!(record.name, "Çiya Sofrası");
        assert_eq!(record.rating, "4.6");
        assert_eq!(record.review_count, "5120 yorum");
        assert_eq!(record.category, "Anadolu restoranı");
        assert_eq!(record.price_tier, "₺₺");
        assert_eq!(record.address, "Caferağa, Güneşli Bahçe Sok. No:43, 34710 Kadıköy/İstanbul");
        assert_eq!(record.phone, "0216 330 31 90");
        assert_eq!(record.website, "ciya.com.tr");
        assert_eq!(record.hours, "Bugün: 11:00 - 22:00");
    }

    #[test]
    fn placeholder_uses_output_language() {
        let record = PlaceRecord::placeholder(&ENGLISH);
        assert_eq!(record.name, "Unknown_Place");
        assert_eq!(record.hours, "Not specified");
        for field in Field::ALL {
            assert!(!record.get(field).is_empty());
        }
    }

    #[test]
    fn csv_headers_are_the_turkish_column_names() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .serialize(PlaceRecord::placeholder(&TURKISH))
            .expect("serialize");
        let bytes = writer.into_inner().expect("flush");
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(text.starts_with(
            "Mekan_Adi,Puan,Yorum_Sayisi,Adres,Telefon,Web_Sitesi,Kategori,Fiyat_Seviyesi,Calisma_Saatleri\n"
        ));
    }
}
