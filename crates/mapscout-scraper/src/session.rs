//! Browser capability consumed by the pipeline.
//!
//! The pipeline never talks to a browser directly. It opens sessions from a
//! shared [`BrowserContext`] and drives each one through [`PageSession`].
//! [`crate::browser::ChromiumContext`] is the production implementation;
//! tests use scripted in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SessionError;

/// Load condition awaited after a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    DomContentLoaded,
    NetworkIdle,
}

/// A DOM query expressed in one of the two languages the pipeline uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    #[must_use]
    pub fn css(selector: &str) -> Self {
        Selector::Css(selector.to_string())
    }

    #[must_use]
    pub fn xpath(expression: &str) -> Self {
        Selector::XPath(expression.to_string())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css:{s}"),
            Selector::XPath(x) => write!(f, "xpath:{x}"),
        }
    }
}

/// Snapshot of a matched element at query time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementHandle {
    /// Resolved `href`, for anchors.
    pub href: Option<String>,
    pub text: String,
}

/// One browser tab, exclusively owned by the task that opened it.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate and wait for `wait` or until `timeout` expires.
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// URL currently displayed, after redirects.
    async fn current_url(&self) -> Result<String, SessionError>;

    /// Wait until at least one element matches `selector`.
    ///
    /// Returns [`SessionError::Timeout`] when nothing matched in time.
    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), SessionError>;

    /// All elements currently matching `selector`, in document order.
    async fn query_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, SessionError>;

    /// Click the first element matching `selector`. Returns `false` when
    /// nothing matched.
    async fn click(&self, selector: &Selector) -> Result<bool, SessionError>;

    /// Evaluate a script expression and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, SessionError>;

    /// Raw markup of the rendered document.
    async fn content(&self) -> Result<String, SessionError>;

    async fn close(self: Box<Self>) -> Result<(), SessionError>;
}

/// Shared browser state (cookies, locale, viewport) that hands out sessions.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, SessionError>;

    async fn shutdown(&self) -> Result<(), SessionError>;
}

/// Close `session`, logging rather than propagating a failure to close.
pub(crate) async fn close_quietly(session: Box<dyn PageSession>, context: &str) {
    if let Err(err) = session.close().await {
        tracing::debug!(context, error = %err, "failed to close page session");
    }
}
