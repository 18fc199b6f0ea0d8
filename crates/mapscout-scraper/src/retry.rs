//! Retry with exponential backoff for timed-out browser operations.
//!
//! Only transient conditions are retried. A navigation that timed out may
//! succeed on a second attempt; a navigation the browser rejected outright,
//! or a script that failed to evaluate, will not.

use std::future::Future;
use std::time::Duration;

use crate::error::SessionError;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`SessionError::Timeout`]: the page did not reach its load condition in time.
/// - [`SessionError::Transport`]: the browser connection hiccuped.
///
/// Everything else is returned immediately.
fn is_retriable(err: &SessionError) -> bool {
    matches!(
        err,
        SessionError::Timeout { .. } | SessionError::Transport(_)
    )
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a retriable error the function sleeps for `backoff_base_ms * 2^attempt`
/// milliseconds and tries again, up to `max_retries` additional attempts
/// after the first try. If all retries are exhausted the last error is
/// returned.
///
/// With `max_retries = 1` the operation is attempted at most twice.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SessionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
{
    let mut last_err;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                last_err = err;
            }
        }

        let delay_ms = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms,
            error = %last_err,
            "transient browser error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        attempt += 1;
    }
}
