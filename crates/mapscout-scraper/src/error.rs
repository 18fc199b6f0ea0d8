use thiserror::Error;

/// Failures reported by a [`crate::session::PageSession`] or
/// [`crate::session::BrowserContext`] implementation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Evaluate(String),

    #[error("browser transport error: {0}")]
    Transport(String),

    #[error("failed to launch browser: {0}")]
    Launch(String),
}

impl SessionError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }
}

#[derive(Debug, Error)]
pub enum ScraperError {
    /// No results container appeared and no direct detail links were found.
    #[error("no results container for query \"{query}\" and no direct place links")]
    DiscoveryUnavailable { query: String },

    #[error("navigation to {url} exceeded {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("embedded metadata could not be decoded: {reason}")]
    MetadataDecode { reason: String },

    #[error("no name could be extracted from {link}")]
    MandatoryFieldMissing { link: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ScraperError {
    /// Map a session timeout during navigation onto [`ScraperError::NavigationTimeout`].
    pub(crate) fn from_navigation(url: &str, err: SessionError) -> Self {
        match err {
            SessionError::Timeout { timeout_ms, .. } => ScraperError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms,
            },
            other => ScraperError::Session(other),
        }
    }
}
