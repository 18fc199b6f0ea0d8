//! Production browser backend.

mod chromium;

pub use chromium::{ChromiumContext, ChromiumSession, LaunchOptions};

use rand::Rng;

/// Pick one user agent at random from `agents` for this run.
#[must_use]
pub fn choose_user_agent(agents: &[String]) -> Option<&str> {
    if agents.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..agents.len());
    agents.get(idx).map(String::as_str)
}
