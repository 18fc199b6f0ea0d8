//! Scripted in-memory browser for integration tests.
//!
//! The search view is a results feed that reveals one batch of place links
//! per scroll. Detail pages are canned markup keyed by URL. Every session
//! opened and closed is counted so tests can assert the concurrency bound.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use mapscout_scraper::dom;
use mapscout_scraper::{BrowserContext, ElementHandle, PageSession, Selector, SessionError, WaitCondition};

pub const PLACE_BASE: &str = "https://www.google.com/maps/place/";

/// `https://www.google.com/maps/place/<slug>`
pub fn place_link(slug: &str) -> String {
    format!("{PLACE_BASE}{slug}")
}

/// How the search view behaves.
#[derive(Debug, Clone, Default)]
pub struct SearchScript {
    /// Links revealed by each scroll. `None` means the feed never appears.
    pub batches: Option<Vec<Vec<String>>>,
    /// Scroll count after which the end-of-list marker is shown.
    pub end_marker_after: Option<usize>,
    /// URL the search view redirects to.
    pub redirect: Option<String>,
    /// Place anchors present on a search view without a feed.
    pub direct_anchors: Vec<String>,
    /// Consent prompt laid over the search view.
    pub consent: Option<ConsentPrompt>,
    /// Navigating to the search view always times out.
    pub unreachable: bool,
    /// Scroll count from which scrolling never completes.
    pub hang_after_scrolls: Option<usize>,
}

/// Which controls a scripted consent prompt offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentPrompt {
    /// An "Accept all" button.
    AcceptAll,
    /// Only some other consent button, e.g. "Reject all".
    OtherButton,
    /// Visible, but no click lands.
    Stuck,
}

impl SearchScript {
    pub fn feed(batches: Vec<Vec<String>>) -> Self {
        Self {
            batches: Some(batches),
            ..Self::default()
        }
    }
}

/// How a detail page behaves when navigated to.
#[derive(Debug, Clone)]
pub enum PageScript {
    Markup(String),
    /// Loads after `delay`.
    Slow { delay: Duration, markup: String },
    /// Every navigation times out.
    Timeout,
    /// The browser rejects the navigation.
    Broken,
}

#[derive(Debug, Default)]
struct Counters {
    open: usize,
    max_open: usize,
    opened: usize,
    closed: usize,
    navigations: HashMap<String, usize>,
}

#[derive(Debug, Default)]
struct Script {
    search: SearchScript,
    pages: HashMap<String, PageScript>,
}

/// A [`BrowserContext`] whose pages follow a fixed script.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    script: Arc<Mutex<Script>>,
    counters: Arc<Mutex<Counters>>,
}

impl FakeBrowser {
    pub fn new(search: SearchScript) -> Self {
        let browser = Self::default();
        browser.script.lock().unwrap().search = search;
        browser
    }

    #[must_use]
    pub fn with_page(self, link: &str, page: PageScript) -> Self {
        self.script.lock().unwrap().pages.insert(link.to_string(), page);
        self
    }

    #[must_use]
    pub fn with_markup(self, link: &str, markup: &str) -> Self {
        self.with_page(link, PageScript::Markup(markup.to_string()))
    }

    pub fn max_open(&self) -> usize {
        self.counters.lock().unwrap().max_open
    }

    pub fn open(&self) -> usize {
        self.counters.lock().unwrap().open
    }

    pub fn opened(&self) -> usize {
        self.counters.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.counters.lock().unwrap().closed
    }

    pub fn navigations(&self, url: &str) -> usize {
        self.counters
            .lock()
            .unwrap()
            .navigations
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// A detached session for driving discovery directly.
    pub fn page(&self) -> FakePage {
        FakePage {
            script: Arc::clone(&self.script),
            counters: Arc::clone(&self.counters),
            state: Mutex::new(PageState::default()),
        }
    }
}

#[async_trait]
impl BrowserContext for FakeBrowser {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, SessionError> {
        {
            let mut counters = self.counters.lock().unwrap();
            counters.open += 1;
            counters.opened += 1;
            counters.max_open = counters.max_open.max(counters.open);
        }
        Ok(Box::new(self.page()))
    }

    async fn shutdown(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    on_search: bool,
    scrolls: usize,
    markup: Option<String>,
    consent_dismissed: bool,
}

pub struct FakePage {
    script: Arc<Mutex<Script>>,
    counters: Arc<Mutex<Counters>>,
    state: Mutex<PageState>,
}

impl FakePage {
    fn search(&self) -> SearchScript {
        self.script.lock().unwrap().search.clone()
    }

    /// The prompt currently covering the search view, if any.
    fn consent_prompt(&self) -> Option<ConsentPrompt> {
        let state = self.state.lock().unwrap();
        if !state.on_search || state.consent_dismissed {
            return None;
        }
        self.search().consent
    }

    fn feed_visible(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.on_search && self.search().batches.is_some()
    }

    /// Batches revealed so far, capped at the number scripted.
    fn revealed(&self) -> usize {
        let scrolls = self.state.lock().unwrap().scrolls;
        self.search()
            .batches
            .map_or(0, |batches| scrolls.min(batches.len()))
    }

    fn visible_links(&self) -> Vec<String> {
        let revealed = self.revealed();
        self.search()
            .batches
            .unwrap_or_default()
            .into_iter()
            .take(revealed)
            .flatten()
            .collect()
    }

    fn anchors(links: Vec<String>) -> Vec<ElementHandle> {
        links
            .into_iter()
            .map(|href| ElementHandle {
                href: Some(href),
                text: String::new(),
            })
            .collect()
    }
}

fn timeout(operation: &str, timeout: Duration) -> SessionError {
    SessionError::Timeout {
        operation: operation.to_string(),
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn navigate(
        &self,
        url: &str,
        _wait: WaitCondition,
        wait_timeout: Duration,
    ) -> Result<(), SessionError> {
        *self
            .counters
            .lock()
            .unwrap()
            .navigations
            .entry(url.to_string())
            .or_default() += 1;

        let page = self.script.lock().unwrap().pages.get(url).cloned();
        if page.is_none() && self.search().unreachable {
            return Err(timeout(url, wait_timeout));
        }
        let markup = match page {
            Some(PageScript::Markup(markup)) => Some(markup),
            Some(PageScript::Slow { delay, markup }) => {
                if delay > wait_timeout {
                    tokio::time::sleep(wait_timeout).await;
                    return Err(timeout(url, wait_timeout));
                }
                tokio::time::sleep(delay).await;
                Some(markup)
            }
            Some(PageScript::Timeout) => return Err(timeout(url, wait_timeout)),
            Some(PageScript::Broken) => {
                return Err(SessionError::Navigation {
                    url: url.to_string(),
                    reason: "net::ERR_CONNECTION_RESET".to_string(),
                })
            }
            None => None,
        };

        let mut state = self.state.lock().unwrap();
        state.scrolls = 0;
        state.consent_dismissed = false;
        if let Some(markup) = markup {
            state.url = url.to_string();
            state.on_search = false;
            state.markup = Some(markup);
        } else {
            state.url = self
                .script
                .lock()
                .unwrap()
                .search
                .redirect
                .clone()
                .unwrap_or_else(|| url.to_string());
            state.on_search = true;
            state.markup = None;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn wait_for(&self, selector: &Selector, wait_timeout: Duration) -> Result<(), SessionError> {
        if *selector == dom::feed() && self.feed_visible() {
            return Ok(());
        }
        if *selector == dom::consent_any() && self.consent_prompt().is_some() {
            return Ok(());
        }
        Err(timeout(&selector.to_string(), wait_timeout))
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, SessionError> {
        if !self.state.lock().unwrap().on_search {
            return Ok(Vec::new());
        }
        if *selector == dom::feed_place_anchor() {
            return Ok(Self::anchors(self.visible_links()));
        }
        if *selector == dom::place_anchor() {
            let links = if self.feed_visible() {
                self.visible_links()
            } else {
                self.search().direct_anchors
            };
            return Ok(Self::anchors(links));
        }
        if *selector == dom::end_of_list() {
            let scrolls = self.state.lock().unwrap().scrolls;
            let shown = self
                .search()
                .end_marker_after
                .is_some_and(|after| scrolls >= after);
            return Ok(if shown {
                vec![ElementHandle {
                    href: None,
                    text: "You've reached the end of the list.".to_string(),
                }]
            } else {
                Vec::new()
            });
        }
        Ok(Vec::new())
    }

    async fn click(&self, selector: &Selector) -> Result<bool, SessionError> {
        let Some(prompt) = self.consent_prompt() else {
            return Ok(false);
        };
        let clicked = match prompt {
            ConsentPrompt::AcceptAll => {
                *selector == dom::consent_accept() || *selector == dom::consent_any()
            }
            ConsentPrompt::OtherButton => *selector == dom::consent_any(),
            ConsentPrompt::Stuck => false,
        };
        if clicked {
            self.state.lock().unwrap().consent_dismissed = true;
        }
        Ok(clicked)
    }

    async fn evaluate(&self, script: &str) -> Result<Value, SessionError> {
        if script == dom::SCROLL_FEED_SCRIPT {
            if !self.feed_visible() {
                return Ok(Value::Bool(false));
            }
            let scrolls = self.state.lock().unwrap().scrolls;
            if self.search().hang_after_scrolls.is_some_and(|after| scrolls >= after) {
                std::future::pending::<()>().await;
            }
            self.state.lock().unwrap().scrolls += 1;
            return Ok(Value::Bool(true));
        }
        if script == dom::FEED_EXTENT_SCRIPT {
            if !self.feed_visible() {
                return Ok(Value::Null);
            }
            let extent = 100 * (self.revealed() as u64 + 1);
            return Ok(Value::from(extent));
        }
        Err(SessionError::Evaluate(format!("unscripted script: {script}")))
    }

    async fn content(&self) -> Result<String, SessionError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .markup
            .clone()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        let mut counters = self.counters.lock().unwrap();
        counters.open = counters.open.saturating_sub(1);
        counters.closed += 1;
        Ok(())
    }
}
