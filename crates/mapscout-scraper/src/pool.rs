//! Bounded-concurrency visits of candidate detail pages.
//!
//! Every link becomes one task in a [`JoinSet`]. A task holds a semaphore
//! permit for the whole life of its page session: acquired before the
//! session is opened and released only after it is closed, so at most
//! `concurrency` sessions are ever open. Per-visit failures are folded into
//! a [`VisitOutcome`] and never abort sibling visits.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mapscout_core::PlaceRecord;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::error::ScraperError;
use crate::extract::DetailExtractor;
use crate::links::CandidateLink;
use crate::retry::retry_with_backoff;
use crate::session::{close_quietly, BrowserContext, PageSession, WaitCondition};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum simultaneously open sessions (`C`); values below 1 act as 1.
    pub concurrency: usize,
    pub navigation_timeout: Duration,
    /// Extra attempts after a timed-out navigation.
    pub navigation_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Where raw markup of pages that yielded no record is written.
    pub debug_dump_dir: Option<PathBuf>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            navigation_timeout: Duration::from_secs(30),
            navigation_retries: 1,
            retry_backoff_base_ms: 500,
            debug_dump_dir: None,
        }
    }
}

/// Result of one detail visit.
#[derive(Debug, Clone)]
pub enum VisitOutcome {
    Extracted(PlaceRecord),
    /// The page loaded but yielded no record.
    Empty { link: String, reason: String },
    /// The page could not be loaded or the task failed.
    Failed { link: String, error: String },
    /// Not started before the run deadline.
    Skipped { link: String },
}

impl VisitOutcome {
    #[must_use]
    pub fn link(&self) -> &str {
        match self {
            VisitOutcome::Extracted(record) => &record.link,
            VisitOutcome::Empty { link, .. }
            | VisitOutcome::Failed { link, .. }
            | VisitOutcome::Skipped { link } => link,
        }
    }

    #[must_use]
    pub fn into_record(self) -> Option<PlaceRecord> {
        match self {
            VisitOutcome::Extracted(record) => Some(record),
            _ => None,
        }
    }
}

/// Tally of outcomes for the end-of-pool log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitSummary {
    pub extracted: usize,
    pub empty: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl VisitSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[VisitOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                VisitOutcome::Extracted(_) => summary.extracted += 1,
                VisitOutcome::Empty { .. } => summary.empty += 1,
                VisitOutcome::Failed { .. } => summary.failed += 1,
                VisitOutcome::Skipped { .. } => summary.skipped += 1,
            }
        }
        summary
    }
}

/// Visit every link with at most `config.concurrency` sessions open.
///
/// Returns one outcome per link, in completion order. The call returns only
/// after every task has resolved.
pub async fn visit_all(
    context: Arc<dyn BrowserContext>,
    links: Vec<CandidateLink>,
    extractor: Arc<DetailExtractor>,
    config: &PoolConfig,
    deadline: Instant,
) -> Vec<VisitOutcome> {
    let total = links.len();
    let permits = config.concurrency.clamp(1, Semaphore::MAX_PERMITS);
    let semaphore = Arc::new(Semaphore::new(permits));
    let config = Arc::new(config.clone());
    let mut join_set = JoinSet::new();
    let mut pending: HashSet<String> = HashSet::with_capacity(total);

    tracing::info!(total, concurrency = permits, "visiting place pages");

    for link in links {
        let link = link.into_string();
        pending.insert(link.clone());
        let semaphore = Arc::clone(&semaphore);
        let context = Arc::clone(&context);
        let extractor = Arc::clone(&extractor);
        let config = Arc::clone(&config);

        join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return VisitOutcome::Failed {
                    link,
                    error: "concurrency limiter closed".to_string(),
                };
            };
            if Instant::now() >= deadline {
                tracing::debug!(link, "run deadline reached before visit started");
                return VisitOutcome::Skipped { link };
            }
            visit_one(context.as_ref(), link, &extractor, &config, deadline).await
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(outcome) => {
                pending.remove(outcome.link());
                outcomes.push(outcome);
            }
            Err(err) => tracing::warn!(error = %err, "visit task failed"),
        }
    }

    // Links still pending belong to tasks that panicked or were cancelled.
    for link in pending {
        outcomes.push(VisitOutcome::Failed {
            link,
            error: "visit task failed".to_string(),
        });
    }

    let summary = VisitSummary::from_outcomes(&outcomes);
    tracing::info!(
        extracted = summary.extracted,
        empty = summary.empty,
        failed = summary.failed,
        skipped = summary.skipped,
        "place page visits finished"
    );
    outcomes
}

/// One detail visit. The session is closed on every path.
async fn visit_one(
    context: &dyn BrowserContext,
    link: String,
    extractor: &DetailExtractor,
    config: &PoolConfig,
    deadline: Instant,
) -> VisitOutcome {
    let session = match context.new_session().await {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(link, error = %err, "could not open page session");
            return VisitOutcome::Failed {
                link,
                error: err.to_string(),
            };
        }
    };

    let remaining = deadline.saturating_duration_since(Instant::now());
    let loaded = tokio::time::timeout(remaining, load_markup(session.as_ref(), &link, config)).await;
    close_quietly(session, &link).await;

    let markup = match loaded {
        Ok(Ok(markup)) => markup,
        Ok(Err(err)) => {
            tracing::warn!(link, error = %err, "place page failed to load");
            return VisitOutcome::Failed {
                link,
                error: err.to_string(),
            };
        }
        Err(_) => {
            tracing::warn!(link, "run deadline reached during visit");
            return VisitOutcome::Failed {
                link,
                error: "run deadline reached during visit".to_string(),
            };
        }
    };

    match extractor.extract(&markup, &link) {
        Ok(record) => {
            tracing::debug!(link, name = %record.name, "extracted place");
            VisitOutcome::Extracted(record)
        }
        Err(err) => {
            tracing::warn!(link, error = %err, "no record extracted");
            if let Some(dir) = &config.debug_dump_dir {
                dump_markup(dir, &link, &markup).await;
            }
            VisitOutcome::Empty {
                link,
                reason: err.to_string(),
            }
        }
    }
}

async fn load_markup(
    session: &dyn PageSession,
    link: &str,
    config: &PoolConfig,
) -> Result<String, ScraperError> {
    let timeout = config.navigation_timeout;
    retry_with_backoff(config.navigation_retries, config.retry_backoff_base_ms, move || {
        session.navigate(link, WaitCondition::DomContentLoaded, timeout)
    })
    .await
    .map_err(|err| ScraperError::from_navigation(link, err))?;

    Ok(session.content().await?)
}

/// File name for a link's debug dump.
#[must_use]
pub fn dump_file_name(link: &str) -> String {
    format!("{:x}.html", Sha256::digest(link.as_bytes()))
}

async fn dump_markup(dir: &Path, link: &str, markup: &str) {
    let path = dir.join(dump_file_name(link));
    let written = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, markup).await
    }
    .await;
    match written {
        Ok(()) => tracing::debug!(link, path = %path.display(), "wrote debug dump"),
        Err(err) => tracing::debug!(link, error = %err, "failed to write debug dump"),
    }
}
