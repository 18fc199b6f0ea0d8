//! One-shot dismissal of the cookie/consent interstitial.

use std::time::Duration;

use crate::dom;
use crate::session::PageSession;

/// What happened when we looked for a consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    /// An "accept all" control was clicked.
    Accepted,
    /// Some other consent control was clicked.
    Dismissed,
    NotPresent,
    /// A prompt was seen but could not be dismissed; discovery continues anyway.
    Failed,
}

/// Dismiss a consent prompt if one shows up within `timeout`.
///
/// Never fails: every problem is logged and folded into the outcome. The
/// whole interaction, including the settle pause after a click, is bounded
/// by twice `timeout`.
pub async fn resolve_consent(session: &dyn PageSession, timeout: Duration) -> ConsentOutcome {
    let bound = timeout.saturating_mul(2);
    match tokio::time::timeout(bound, try_resolve(session, timeout)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(timeout_ms = bound.as_millis(), "consent handling timed out");
            ConsentOutcome::Failed
        }
    }
}

async fn try_resolve(session: &dyn PageSession, timeout: Duration) -> ConsentOutcome {
    match session.wait_for(&dom::consent_any(), timeout).await {
        Ok(()) => {}
        Err(err) if err.is_timeout() => {
            tracing::debug!("no consent form detected");
            return ConsentOutcome::NotPresent;
        }
        Err(err) => {
            tracing::warn!(error = %err, "error waiting for consent form");
            return ConsentOutcome::Failed;
        }
    }

    let outcome = match session.click(&dom::consent_accept()).await {
        Ok(true) => {
            tracing::info!("accepted consent form");
            ConsentOutcome::Accepted
        }
        Ok(false) => match session.click(&dom::consent_any()).await {
            Ok(true) => {
                tracing::info!("clicked available consent button");
                ConsentOutcome::Dismissed
            }
            Ok(false) => ConsentOutcome::Failed,
            Err(err) => {
                tracing::warn!(error = %err, "error clicking consent button");
                ConsentOutcome::Failed
            }
        },
        Err(err) => {
            tracing::warn!(error = %err, "error clicking consent accept button");
            ConsentOutcome::Failed
        }
    };

    if matches!(outcome, ConsentOutcome::Accepted | ConsentOutcome::Dismissed) {
        // Let the interstitial tear down before the feed is queried.
        tokio::time::sleep(timeout.min(Duration::from_secs(1))).await;
    }
    outcome
}
