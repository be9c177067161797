//! One complete run: load the listing, extract the place, harvest reviews,
//! write everything into the run's output directory.

use std::path::PathBuf;

use tracing::info;

use crate::acquire;
use crate::config::RunConfig;
use crate::driver::PageDriver;
use crate::error::Result;
use crate::export::{self, OutputDir, RunSummary};
use crate::place::{self, PlaceRecord, Provenance};
use crate::reviews::{HarvestOutcome, Harvester};

#[derive(Debug)]
pub struct RunReport {
    pub output_dir: PathBuf,
    pub place: PlaceRecord,
    pub provenance: Provenance,
    pub reviews: HarvestOutcome,
    pub place_csv: PathBuf,
    pub reviews_csv: PathBuf,
    pub summary_json: Option<PathBuf>,
}

/// Fails only when the page cannot be loaded or the output cannot be
/// written; everything in between degrades to sentinels.
pub async fn run<D: PageDriver>(driver: &mut D, config: &RunConfig) -> Result<RunReport> {
    let lexicon = config.lexicon();
    let pacing = &config.pacing;
    info!(session = %config.session_id, max_reviews = config.max_reviews, "run started");

    acquire::prepare_page(driver, &config.url, lexicon, pacing).await?;

    let name = place::extract_name(driver, lexicon, pacing).await;
    let dir = OutputDir::create(&config.output_root, &name, &config.session_id, lexicon)?;
    export::save_screenshot(driver, &dir, export::MAIN_PAGE_PNG).await;

    acquire::show_overview(driver, pacing).await;
    let (place, provenance) = place::extract_details(driver, name, lexicon, pacing).await;
    let place_csv = export::write_place_csv(&dir, &place)?;

    let reviews = Harvester::new(driver, lexicon, pacing, config.max_reviews)
        .with_artifacts(&dir)
        .with_sort(config.sort)
        .run()
        .await;
    let reviews_csv = export::write_reviews_csv(&dir, &reviews.records)?;
    export::save_screenshot(driver, &dir, export::FINAL_PNG).await;

    let summary_json = if config.write_json {
        let summary = RunSummary::new(
            &config.session_id,
            &config.url,
            &dir,
            &place,
            &provenance,
            &reviews,
        );
        Some(export::write_summary_json(&dir, &summary)?)
    } else {
        None
    };

    info!(
        dir = %dir.path().display(),
        reviews = reviews.collected,
        "run finished"
    );
    Ok(RunReport {
        output_dir: dir.path().to_path_buf(),
        place,
        provenance,
        reviews,
        place_csv,
        reviews_csv,
        summary_json,
    })
}
