//! `extract` subcommand: run the extraction engine over a saved page.

use std::path::Path;

use anyhow::Context;
use mapscout_core::{ExtractionDepth, PlaceRecord, ScrapeResponse};
use mapscout_scraper::{aggregate, DetailExtractor};

pub(crate) async fn run_extract(
    file: &Path,
    link: Option<&str>,
    details: bool,
) -> anyhow::Result<()> {
    let markup = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let link = link.map_or_else(|| file.display().to_string(), str::to_string);

    let records = extract_records(&markup, &link, ExtractionDepth::from_details_flag(details));
    let response = ScrapeResponse::new(true, link, records);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Zero or one record; a page without a name yields nothing.
pub(crate) fn extract_records(markup: &str, link: &str, depth: ExtractionDepth) -> Vec<PlaceRecord> {
    let extractor = DetailExtractor::new(depth);
    match extractor.extract(markup, link) {
        Ok(record) => aggregate(vec![record]),
        Err(err) => {
            tracing::warn!(link, error = %err, "no record extracted from saved page");
            Vec::new()
        }
    }
}
