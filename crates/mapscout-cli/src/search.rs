//! `search` subcommand: launch Chromium, run the pipeline, print JSON.

use mapscout_core::{AppConfig, ExtractionDepth, SearchRequest};
use mapscout_scraper::{scrape_with_chromium, Scraper, ScraperConfig};

#[derive(Debug, Clone)]
pub(crate) struct SearchArgs {
    pub query: String,
    pub max_places: u32,
    pub lang: String,
    pub headless: bool,
    pub details: bool,
}

impl SearchArgs {
    pub(crate) fn to_request(&self) -> anyhow::Result<SearchRequest> {
        Ok(SearchRequest::new(
            &self.query,
            self.max_places,
            &self.lang,
            self.headless,
            ExtractionDepth::from_details_flag(self.details),
        )?)
    }
}

pub(crate) async fn run_search(config: &AppConfig, args: &SearchArgs) -> anyhow::Result<()> {
    let request = args.to_request()?;
    let scraper = Scraper::new(ScraperConfig::from_app_config(config));

    let response = scrape_with_chromium(
        &scraper,
        &request,
        &config.user_agents,
        config.chrome_path.clone(),
    )
    .await?;

    if !response.success {
        tracing::warn!(query = %response.query, "search returned no usable results");
    }
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
