//! Scroll-driven discovery of place detail links on the search view.
//!
//! The results feed loads more entries as it is scrolled. Each iteration
//! scrolls the feed to the bottom, pauses for a randomized interval, re-reads
//! every place anchor and unions them into a [`CandidateSet`]. Iterations are
//! strictly sequential. The loop stops on the first of:
//!
//! 1. the target count is reached (the set is truncated to exactly the target),
//! 2. the "end of list" marker is visible,
//! 3. `stagnation_limit` consecutive iterations where neither the feed's
//!    scroll extent nor the link set grew,
//! 4. the iteration ceiling or the run deadline.
//!
//! Every browser call made here is abandoned once the run deadline passes.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::consent::resolve_consent;
use crate::dom;
use crate::error::{ScraperError, SessionError};
use crate::links::{CandidateLink, CandidateSet};
use crate::session::{PageSession, WaitCondition};

/// Inclusive band the anti-rate-limit pause is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseBand {
    pub min: Duration,
    pub max: Duration,
}

impl PauseBand {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// No pause at all.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Draw one pause length from the band.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub navigation_timeout: Duration,
    pub consent_timeout: Duration,
    pub feed_timeout: Duration,
    pub scroll_pause: PauseBand,
    /// Consecutive no-growth iterations tolerated before giving up (`K`).
    pub stagnation_limit: u32,
    pub max_iterations: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            consent_timeout: Duration::from_secs(5),
            feed_timeout: Duration::from_secs(10),
            scroll_pause: PauseBand::new(Duration::from_millis(1000), Duration::from_millis(2000)),
            stagnation_limit: 5,
            max_iterations: 200,
        }
    }
}

/// Why discovery stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    EndOfList,
    Stagnated,
    IterationLimit,
    Deadline,
    /// The search view resolved straight to one place.
    SinglePlace,
    /// No feed, but place anchors were present on the page.
    DirectLinks,
    /// The feed disappeared or a browser call failed mid-scroll.
    Interrupted,
    /// The search view itself could not be loaded.
    NavigationFailed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StopReason::TargetReached => "target_reached",
            StopReason::EndOfList => "end_of_list",
            StopReason::Stagnated => "stagnated",
            StopReason::IterationLimit => "iteration_limit",
            StopReason::Deadline => "deadline",
            StopReason::SinglePlace => "single_place",
            StopReason::DirectLinks => "direct_links",
            StopReason::Interrupted => "interrupted",
            StopReason::NavigationFailed => "navigation_failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub links: Vec<CandidateLink>,
    pub stop: StopReason,
    pub iterations: u32,
}

impl DiscoveryOutcome {
    fn new(links: CandidateSet, stop: StopReason, iterations: u32) -> Self {
        Self {
            links: links.into_links(),
            stop,
            iterations,
        }
    }
}

/// Per-iteration stop decision, independent of any browser.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    target: usize,
    stagnation_limit: u32,
    last_extent: Option<u64>,
    stagnant: u32,
}

impl ScrollTracker {
    #[must_use]
    pub fn new(target: usize, stagnation_limit: u32, initial_extent: Option<u64>) -> Self {
        Self {
            target,
            stagnation_limit: stagnation_limit.max(1),
            last_extent: initial_extent,
            stagnant: 0,
        }
    }

    /// Record one iteration and decide whether to stop.
    ///
    /// `found` is the running set size after the union, `newly_found` how many
    /// links this iteration added. The stagnation counter resets whenever the
    /// extent changed or new links appeared.
    pub fn observe(
        &mut self,
        found: usize,
        newly_found: usize,
        extent: Option<u64>,
        end_marker: bool,
    ) -> Option<StopReason> {
        if found >= self.target {
            return Some(StopReason::TargetReached);
        }
        if end_marker {
            return Some(StopReason::EndOfList);
        }

        let extent_changed = extent != self.last_extent;
        self.last_extent = extent;

        if extent_changed || newly_found > 0 {
            self.stagnant = 0;
            return None;
        }

        self.stagnant += 1;
        tracing::debug!(
            attempt = self.stagnant,
            limit = self.stagnation_limit,
            "scroll extent unchanged and no new links"
        );
        (self.stagnant >= self.stagnation_limit).then_some(StopReason::Stagnated)
    }

    #[must_use]
    pub fn stagnant_iterations(&self) -> u32 {
        self.stagnant
    }
}

/// Navigate `session` to `search_url` and collect up to `target` place links.
///
/// Navigation failures and mid-scroll browser errors are not errors here:
/// whatever was collected so far is returned with the matching
/// [`StopReason`].
///
/// # Errors
///
/// Returns [`ScraperError::DiscoveryUnavailable`] when the results feed
/// never appears, the view is not a single place, and no place anchors are
/// present.
pub async fn discover_links(
    session: &dyn PageSession,
    query: &str,
    search_url: &str,
    target: usize,
    config: &DiscoveryConfig,
    deadline: Instant,
) -> Result<DiscoveryOutcome, ScraperError> {
    let mut links = CandidateSet::new();
    if target == 0 {
        return Ok(DiscoveryOutcome::new(links, StopReason::TargetReached, 0));
    }

    tracing::info!(search_url, "navigating to search view");
    let nav_timeout = bounded(config.navigation_timeout, deadline);
    if let Err(err) = session
        .navigate(search_url, WaitCondition::DomContentLoaded, nav_timeout)
        .await
    {
        let err = ScraperError::from_navigation(search_url, err);
        tracing::warn!(error = %err, "search view failed to load");
        return Ok(DiscoveryOutcome::new(links, StopReason::NavigationFailed, 0));
    }

    match tokio::time::timeout_at(deadline, resolve_consent(session, config.consent_timeout)).await {
        Ok(consent) => tracing::debug!(?consent, "consent resolution finished"),
        Err(_) => tracing::warn!("run deadline passed while handling consent"),
    }
    if Instant::now() >= deadline {
        return Ok(DiscoveryOutcome::new(links, StopReason::Deadline, 0));
    }

    let feed_timeout = bounded(config.feed_timeout, deadline);
    if let Err(err) = before_deadline(deadline, "wait for feed", session.wait_for(&dom::feed(), feed_timeout)).await {
        tracing::info!(error = %err, "results feed not found, checking fallbacks");
        return discover_without_feed(session, query, target, links, deadline).await;
    }

    let mut iterations = 0u32;
    let initial_extent = match before_deadline(deadline, "read feed extent", feed_extent(session)).await {
        Ok(extent) => extent,
        Err(err) => {
            tracing::warn!(error = %err, "could not read feed extent");
            None
        }
    };
    let mut tracker = ScrollTracker::new(target, config.stagnation_limit, initial_extent);

    tracing::info!("scrolling to load places");
    let stop = loop {
        if iterations >= config.max_iterations {
            break StopReason::IterationLimit;
        }
        if Instant::now() >= deadline {
            break StopReason::Deadline;
        }
        iterations += 1;

        match before_deadline(deadline, "scroll feed", scroll_once(session, config.scroll_pause, deadline)).await {
            Ok(Some(step)) => {
                let newly_found = links.extend(step.hrefs.iter().map(String::as_str));
                tracing::info!(found = links.len(), newly_found, iteration = iterations, "unique place links so far");

                if let Some(reason) =
                    tracker.observe(links.len(), newly_found, step.extent, step.end_marker)
                {
                    break reason;
                }
            }
            Ok(None) => {
                tracing::warn!(iteration = iterations, "results feed disappeared while scrolling");
                break StopReason::Interrupted;
            }
            Err(err) if err.is_timeout() && Instant::now() >= deadline => {
                tracing::warn!(iteration = iterations, "run deadline passed while scrolling");
                break StopReason::Deadline;
            }
            Err(err) => {
                tracing::warn!(iteration = iterations, error = %err, "browser error while scrolling");
                break StopReason::Interrupted;
            }
        }
    };

    links.truncate(target);
    tracing::info!(found = links.len(), iterations, %stop, "link discovery finished");
    Ok(DiscoveryOutcome::new(links, stop, iterations))
}

/// Observations from one scroll iteration.
struct ScrollStep {
    hrefs: Vec<String>,
    extent: Option<u64>,
    end_marker: bool,
}

/// Scroll, pause, and re-read the feed. `Ok(None)` when the feed is gone.
async fn scroll_once(
    session: &dyn PageSession,
    pause: PauseBand,
    deadline: Instant,
) -> Result<Option<ScrollStep>, SessionError> {
    let scrolled = session.evaluate(dom::SCROLL_FEED_SCRIPT).await?;
    if scrolled.as_bool() == Some(false) {
        return Ok(None);
    }

    let pause = bounded(pause.sample(), deadline);
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }

    let hrefs = session
        .query_all(&dom::feed_place_anchor())
        .await?
        .into_iter()
        .filter_map(|el| el.href)
        .collect();
    let extent = feed_extent(session).await?;
    let end_marker = !session.query_all(&dom::end_of_list()).await?.is_empty();

    Ok(Some(ScrollStep {
        hrefs,
        extent,
        end_marker,
    }))
}

async fn feed_extent(session: &dyn PageSession) -> Result<Option<u64>, SessionError> {
    let value = session.evaluate(dom::FEED_EXTENT_SCRIPT).await?;
    Ok(value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| {
                // Extents are pixel heights, far below 2^53.
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let px = v.round() as u64;
                px
            })
    }))
}

/// Fallbacks when the feed never appeared: a single-place view, then any
/// place anchors already on the page.
async fn discover_without_feed(
    session: &dyn PageSession,
    query: &str,
    target: usize,
    mut links: CandidateSet,
    deadline: Instant,
) -> Result<DiscoveryOutcome, ScraperError> {
    match before_deadline(deadline, "read current url", session.current_url()).await {
        Ok(url) if dom::is_place_url(&url) => {
            tracing::info!(url, "search resolved to a single place page");
            links.insert(&url);
            return Ok(DiscoveryOutcome::new(links, StopReason::SinglePlace, 0));
        }
        Ok(_) => {}
        Err(err) => tracing::debug!(error = %err, "could not read current url"),
    }

    match before_deadline(deadline, "query place anchors", session.query_all(&dom::place_anchor())).await {
        Ok(anchors) => {
            links.extend(anchors.iter().filter_map(|el| el.href.as_deref()));
        }
        Err(err) => tracing::debug!(error = %err, "direct place anchor query failed"),
    }

    if links.is_empty() {
        tracing::error!(query, "results feed not found and no place links on page");
        return Err(ScraperError::DiscoveryUnavailable {
            query: query.to_string(),
        });
    }

    tracing::info!(found = links.len(), "found place links directly without feed");
    links.truncate(target);
    Ok(DiscoveryOutcome::new(links, StopReason::DirectLinks, 0))
}

/// Await one browser call, giving up with a timeout error at `deadline`.
async fn before_deadline<T>(
    deadline: Instant,
    operation: &str,
    call: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, SessionError> {
    tokio::time::timeout_at(deadline, call)
        .await
        .unwrap_or_else(|_| {
            Err(SessionError::Timeout {
                operation: operation.to_string(),
                timeout_ms: 0,
            })
        })
}

/// Clamp `wait` so it never runs past `deadline`.
pub(crate) fn bounded(wait: Duration, deadline: Instant) -> Duration {
    wait.min(deadline.saturating_duration_since(Instant::now()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_reached_wins_over_end_marker() {
        let mut tracker = ScrollTracker::new(3, 5, Some(100));
        assert_eq!(
            tracker.observe(3, 3, Some(200), true),
            Some(StopReason::TargetReached)
        );
    }

    #[test]
    fn end_marker_stops_even_while_growing() {
        let mut tracker = ScrollTracker::new(50, 5, Some(100));
        assert_eq!(
            tracker.observe(10, 4, Some(300), true),
            Some(StopReason::EndOfList)
        );
    }

    #[test]
    fn stagnation_needs_k_consecutive_idle_iterations() {
        let mut tracker = ScrollTracker::new(50, 5, Some(100));
        for _ in 0..4 {
            assert_eq!(tracker.observe(7, 0, Some(100), false), None);
        }
        assert_eq!(
            tracker.observe(7, 0, Some(100), false),
            Some(StopReason::Stagnated)
        );
    }

    #[test]
    fn new_links_reset_the_stagnation_counter() {
        let mut tracker = ScrollTracker::new(50, 5, Some(100));
        for _ in 0..4 {
            tracker.observe(7, 0, Some(100), false);
        }
        assert_eq!(tracker.stagnant_iterations(), 4);
        assert_eq!(tracker.observe(8, 1, Some(100), false), None);
        assert_eq!(tracker.stagnant_iterations(), 0);
        for _ in 0..4 {
            assert_eq!(tracker.observe(8, 0, Some(100), false), None);
        }
        assert_eq!(
            tracker.observe(8, 0, Some(100), false),
            Some(StopReason::Stagnated)
        );
    }

    #[test]
    fn extent_growth_resets_the_stagnation_counter() {
        let mut tracker = ScrollTracker::new(50, 2, Some(100));
        assert_eq!(tracker.observe(5, 0, Some(100), false), None);
        assert_eq!(tracker.observe(5, 0, Some(180), false), None);
        assert_eq!(tracker.stagnant_iterations(), 0);
        assert_eq!(tracker.observe(5, 0, Some(180), false), None);
        assert_eq!(
            tracker.observe(5, 0, Some(180), false),
            Some(StopReason::Stagnated)
        );
    }

    #[test]
    fn zero_stagnation_limit_is_treated_as_one() {
        let mut tracker = ScrollTracker::new(50, 0, None);
        assert_eq!(
            tracker.observe(1, 0, None, false),
            Some(StopReason::Stagnated)
        );
    }

    #[test]
    fn pause_band_orders_bounds_and_samples_within() {
        let band = PauseBand::new(Duration::from_millis(20), Duration::from_millis(10));
        assert_eq!(band.min, Duration::from_millis(10));
        for _ in 0..50 {
            let d = band.sample();
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
        assert_eq!(PauseBand::none().sample(), Duration::ZERO);
    }

    #[test]
    fn bounded_never_exceeds_remaining_time() {
        let deadline = Instant::now() + Duration::from_millis(50);
        assert!(bounded(Duration::from_secs(30), deadline) <= Duration::from_millis(50));
        let past = Instant::now().checked_sub(Duration::from_millis(1)).unwrap_or_else(Instant::now);
        assert_eq!(bounded(Duration::from_secs(1), past), Duration::ZERO);
    }
}
