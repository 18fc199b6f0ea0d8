//! Search-to-records orchestration.
//!
//! One run opens a search session, discovers candidate links, closes the
//! search session, visits every candidate through the worker pool, and
//! aggregates whatever records came back. Nothing in here returns an error
//! to the caller: every degraded condition ends up in the response.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mapscout_core::{AppConfig, ScrapeResponse, SearchRequest};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::time::Instant;

use crate::aggregate::aggregate;
use crate::browser::{choose_user_agent, ChromiumContext, LaunchOptions};
use crate::discovery::{discover_links, DiscoveryConfig, PauseBand};
use crate::error::{ScraperError, SessionError};
use crate::extract::DetailExtractor;
use crate::metadata::LayoutTable;
use crate::pool::{visit_all, PoolConfig, VisitOutcome};
use crate::session::{close_quietly, BrowserContext};

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://www.google.com/maps/search/";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub search_base_url: String,
    pub discovery: DiscoveryConfig,
    pub pool: PoolConfig,
    /// Wall-clock bound on one whole run.
    pub run_deadline: Duration,
    pub layouts: LayoutTable,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            discovery: DiscoveryConfig::default(),
            pool: PoolConfig::default(),
            run_deadline: Duration::from_secs(600),
            layouts: LayoutTable::default(),
        }
    }
}

impl ScraperConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_base_url: config.search_base_url.clone(),
            discovery: DiscoveryConfig {
                navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
                consent_timeout: Duration::from_secs(config.consent_timeout_secs),
                feed_timeout: Duration::from_secs(config.feed_timeout_secs),
                scroll_pause: PauseBand::new(
                    Duration::from_millis(config.scroll_pause_min_ms),
                    Duration::from_millis(config.scroll_pause_max_ms),
                ),
                stagnation_limit: config.stagnation_limit,
                max_iterations: config.max_scroll_iterations,
            },
            pool: PoolConfig {
                concurrency: config.concurrency,
                navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
                navigation_retries: config.navigation_retries,
                retry_backoff_base_ms: config.retry_backoff_base_ms,
                debug_dump_dir: config.debug_dump_dir.clone(),
            },
            run_deadline: Duration::from_secs(config.run_deadline_secs),
            layouts: LayoutTable::default(),
        }
    }
}

/// `<base>?q=<query>&hl=<lang>` with the query percent-encoded.
///
/// `lang` is inserted as is; [`SearchRequest`] only admits tag characters.
#[must_use]
pub fn search_url(base: &str, query: &str, lang: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{base}{separator}q={}&hl={lang}",
        utf8_percent_encode(query, NON_ALPHANUMERIC)
    )
}

/// `now + budget`, saturating to a far-future instant instead of overflowing.
fn deadline_after(budget: Duration) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

    let now = Instant::now();
    now.checked_add(budget)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Runs searches against any [`BrowserContext`].
#[derive(Debug, Clone, Default)]
pub struct Scraper {
    config: ScraperConfig,
}

impl Scraper {
    #[must_use]
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Run one search end to end inside `context`.
    ///
    /// The context is not shut down; the caller owns it.
    pub async fn run(
        &self,
        context: Arc<dyn BrowserContext>,
        request: &SearchRequest,
    ) -> ScrapeResponse {
        let deadline = deadline_after(self.config.run_deadline);
        let query = request.query();
        let target = request.target_count();
        let url = search_url(&self.config.search_base_url, query, request.lang());
        tracing::info!(query, target, depth = %request.depth(), "starting search run");

        let session = match context.new_session().await {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(query, error = %err, "could not open search session");
                return ScrapeResponse::new(false, query, Vec::new());
            }
        };

        let discovered = discover_links(
            session.as_ref(),
            query,
            &url,
            target,
            &self.config.discovery,
            deadline,
        )
        .await;
        close_quietly(session, &url).await;

        let links = match discovered {
            Ok(outcome) => {
                tracing::info!(
                    query,
                    found = outcome.links.len(),
                    stop = %outcome.stop,
                    iterations = outcome.iterations,
                    "discovery finished"
                );
                outcome.links
            }
            Err(err @ ScraperError::DiscoveryUnavailable { .. }) => {
                tracing::error!(query, error = %err, "discovery unavailable");
                return ScrapeResponse::new(false, query, Vec::new());
            }
            Err(err) => {
                tracing::error!(query, error = %err, "discovery failed");
                return ScrapeResponse::new(true, query, Vec::new());
            }
        };

        if links.is_empty() {
            return ScrapeResponse::new(true, query, Vec::new());
        }

        let extractor = Arc::new(DetailExtractor::with_layouts(
            request.depth(),
            self.config.layouts.clone(),
        ));
        let outcomes = visit_all(context, links, extractor, &self.config.pool, deadline).await;

        let records = outcomes
            .into_iter()
            .filter_map(VisitOutcome::into_record)
            .collect();
        let mut results = aggregate(records);
        results.truncate(target);

        tracing::info!(query, total = results.len(), "search run finished");
        ScrapeResponse::new(true, query, results)
    }
}

/// Launch Chromium for `request`, run it, and shut the browser down.
///
/// # Errors
///
/// Returns [`SessionError::Launch`] when the browser could not be started.
/// Every other failure is folded into the response.
pub async fn scrape_with_chromium(
    scraper: &Scraper,
    request: &SearchRequest,
    user_agents: &[String],
    chrome_path: Option<PathBuf>,
) -> Result<ScrapeResponse, SessionError> {
    let options = LaunchOptions {
        headless: request.headless(),
        lang: request.lang().to_string(),
        user_agent: choose_user_agent(user_agents).map(str::to_string),
        chrome_path,
    };
    let context = Arc::new(ChromiumContext::launch(&options).await?);

    let response = scraper
        .run(Arc::clone(&context) as Arc<dyn BrowserContext>, request)
        .await;

    if let Err(err) = context.shutdown().await {
        tracing::warn!(error = %err, "browser did not shut down cleanly");
    }
    Ok(response)
}
