//! Chromium-backed [`BrowserContext`] using chromiumoxide.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::SessionError;
use crate::session::{BrowserContext, ElementHandle, PageSession, Selector, WaitCondition};

/// Interval between DOM polls while waiting for a selector.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound on a single script evaluation, markup reads included.
const EVALUATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for one browser launch. Shared by every session it opens.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Browser UI and `Accept-Language` locale.
    pub lang: String,
    pub user_agent: Option<String>,
    pub chrome_path: Option<PathBuf>,
}

/// A launched Chromium process.
pub struct ChromiumContext {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumContext {
    /// Launch Chromium with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Launch`] if the configuration is rejected or
    /// the process cannot be started.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--lang={}", options.lang));

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(user_agent) = &options.user_agent {
            builder = builder.arg(format!("--user-agent={user_agent}"));
        }
        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(SessionError::Launch)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::trace!(error = %err, "browser handler event error");
                }
            }
        });

        tracing::info!(headless = options.headless, lang = %options.lang, "launched chromium");
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
        })
    }
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Transport(format!("failed to open page: {e}")))?;
        Ok(Box::new(ChromiumSession { page }))
    }

    async fn shutdown(&self) -> Result<(), SessionError> {
        let closed = self.browser.lock().await.close().await;
        self.handler.abort();
        closed
            .map(|_| ())
            .map_err(|e| SessionError::Transport(format!("failed to close browser: {e}")))
    }
}

/// One Chromium tab.
pub struct ChromiumSession {
    page: Page,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    href: Option<String>,
    #[serde(default)]
    text: String,
}

impl ChromiumSession {
    /// Evaluate `expression` and decode its JSON-serialized result.
    ///
    /// Results are passed through `JSON.stringify` so that `null` and
    /// structured values survive the CDP round trip.
    async fn evaluate_json(&self, expression: &str) -> Result<Value, SessionError> {
        let wrapped = format!(
            "(() => {{ const v = ({expression}); return JSON.stringify(v === undefined ? null : v); }})()"
        );
        let evaluation = async {
            self.page
                .evaluate(wrapped.as_str())
                .await
                .map_err(|e| SessionError::Evaluate(e.to_string()))
        };
        let raw: String = within("evaluate", EVALUATE_TIMEOUT, evaluation)
            .await?
            .into_value()
            .map_err(|e| SessionError::Evaluate(format!("{e:?}")))?;
        serde_json::from_str(&raw).map_err(|e| SessionError::Evaluate(e.to_string()))
    }

    async fn count(&self, selector: &Selector) -> Result<u64, SessionError> {
        let script = format!("{}.length", nodes_expression(selector));
        Ok(self.evaluate_json(&script).await?.as_u64().unwrap_or(0))
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let load = async {
            self.page.goto(url).await?;
            if wait == WaitCondition::NetworkIdle {
                self.page.wait_for_navigation().await?;
            }
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(timeout, load).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(SessionError::Timeout {
                operation: format!("navigate {url}"),
                timeout_ms: millis(timeout),
            }),
        }
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), SessionError> {
        let poll = async {
            loop {
                if self.count(selector).await? > 0 {
                    return Ok(());
                }
                tokio::time::sleep(WAIT_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| SessionError::Timeout {
                operation: format!("wait for {selector}"),
                timeout_ms: millis(timeout),
            })?
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, SessionError> {
        let script = format!(
            "{}.map(n => ({{ href: typeof n.href === 'string' ? n.href : n.getAttribute('href'), text: (n.innerText || n.textContent || '').trim() }}))",
            nodes_expression(selector)
        );
        let value = self.evaluate_json(&script).await?;
        let raw: Vec<RawElement> =
            serde_json::from_value(value).map_err(|e| SessionError::Evaluate(e.to_string()))?;
        Ok(raw
            .into_iter()
            .map(|el| ElementHandle {
                href: el.href,
                text: el.text,
            })
            .collect())
    }

    async fn click(&self, selector: &Selector) -> Result<bool, SessionError> {
        let script = format!(
            "(() => {{ const n = {}[0]; if (!n) {{ return false; }} n.click(); return true; }})()",
            nodes_expression(selector)
        );
        Ok(self.evaluate_json(&script).await?.as_bool().unwrap_or(false))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, SessionError> {
        self.evaluate_json(script).await
    }

    async fn content(&self) -> Result<String, SessionError> {
        let value = self
            .evaluate_json("document.documentElement.outerHTML")
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SessionError::Evaluate("document has no markup".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        self.page
            .close()
            .await
            .map_err(|e| SessionError::Transport(format!("failed to close page: {e}")))
    }
}

/// A JS expression evaluating to an array of the nodes matching `selector`.
fn nodes_expression(selector: &Selector) -> String {
    match selector {
        Selector::Css(css) => format!(
            "Array.from(document.querySelectorAll({}))",
            js_string(css)
        ),
        Selector::XPath(xpath) => format!(
            "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; for (let i = 0; i < r.snapshotLength; i++) {{ out.push(r.snapshotItem(i)); }} return out; }})()",
            js_string(xpath)
        ),
    }
}

/// Quote `raw` as a JS string literal.
fn js_string(raw: &str) -> String {
    Value::String(raw.to_string()).to_string()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Await a CDP call, failing with [`SessionError::Timeout`] after `timeout`.
async fn within<T>(
    operation: &str,
    timeout: Duration,
    call: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, SessionError> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or_else(|_| {
            Err(SessionError::Timeout {
                operation: operation.to_string(),
                timeout_ms: millis(timeout),
            })
        })
}
