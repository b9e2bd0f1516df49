//! CDP-backed implementation of the driver traits.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::process::Child;
use tracing::{debug, warn};

use webpilot_core::{Error, Result};

use crate::cdp::CdpClient;
use crate::launch;
use crate::{Artifact, CaptureOptions, Driver, DriverHandle, ElementAction, Locator, LocatorStrategy, OpenOptions};

/// How long `navigate` waits for the document to settle before giving
/// up and letting later steps find out for themselves.
const NAV_SETTLE_TIMEOUT: Duration = Duration::from_secs(15);
const LOCATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct CdpDriver {
    profiles_dir: PathBuf,
}

impl CdpDriver {
    pub fn new(profiles_dir: PathBuf) -> Self {
        Self { profiles_dir }
    }

    fn fresh_profile_dir(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        self.profiles_dir.join(format!("profile-{}", nanos))
    }
}

#[async_trait]
impl Driver for CdpDriver {
    async fn open(&self, opts: &OpenOptions) -> Result<Box<dyn DriverHandle>> {
        let profile_dir = opts
            .profile_dir
            .clone()
            .unwrap_or_else(|| self.fresh_profile_dir());

        let (child, port) = launch::launch(opts, &profile_dir).await?;
        let ws_url = launch::wait_for_page_target(port, opts.open_timeout).await?;
        let cdp = CdpClient::connect(&ws_url).await?;

        cdp.enable_domain("Page").await?;
        cdp.enable_domain("Runtime").await?;
        cdp.set_viewport(opts.width, opts.height).await?;

        debug!(port = port, ws_url = %ws_url, "Browser instance ready");

        Ok(Box::new(CdpHandle {
            child,
            cdp,
            closed: false,
        }))
    }
}

pub struct CdpHandle {
    child: Child,
    cdp: CdpClient,
    closed: bool,
}

/// JavaScript expression that resolves the locator to an element or null.
fn find_expr(locator: &Locator) -> String {
    match locator.strategy {
        LocatorStrategy::Css => format!(
            "document.querySelector({})",
            js_string(&locator.value)
        ),
        LocatorStrategy::XPath => format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            js_string(&locator.value)
        ),
        // XPath string literals cannot escape quotes, so text matching
        // walks the DOM instead.
        LocatorStrategy::Text => format!(
            "(function() {{ const t = {}; const w = document.createTreeWalker(document.body, NodeFilter.SHOW_ELEMENT); let n; while ((n = w.nextNode())) {{ if (n.children.length === 0 && n.textContent && n.textContent.trim().includes(t)) return n; }} return null; }})()",
            js_string(&locator.value)
        ),
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

impl CdpHandle {
    /// Poll for the element until found or timed out, then run `act_js`
    /// (a function body receiving the element as `el`). Returns whether
    /// the element was acted on.
    async fn poll_and_act(&self, locator: &Locator, act_js: &str, timeout: Duration) -> Result<()> {
        let expr = format!(
            "(function() {{ const el = {}; if (!el) return false; {} return true; }})()",
            find_expr(locator),
            act_js
        );
        let deadline = Instant::now() + timeout;
        loop {
            let found = self.cdp.evaluate(&expr).await?;
            if found.as_bool() == Some(true) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout(format!("element not found: {}", locator)));
            }
            tokio::time::sleep(LOCATE_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl DriverHandle for CdpHandle {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let result = self.cdp.navigate(url).await?;
        if let Some(err) = result.get("errorText").and_then(|v| v.as_str()) {
            return Err(Error::Driver(format!("navigate {}: {}", url, err)));
        }

        // Wait for the document to settle; a page that never finishes
        // loading is not an error here, later steps will see it.
        let deadline = Instant::now() + NAV_SETTLE_TIMEOUT;
        loop {
            if let Ok(state) = self.cdp.evaluate("document.readyState").await {
                match state.as_str() {
                    Some("complete") | Some("interactive") => break,
                    _ => {}
                }
            }
            if Instant::now() >= deadline {
                warn!(url = url, "Document did not settle; continuing");
                break;
            }
            tokio::time::sleep(LOCATE_POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn locate_and_act(
        &mut self,
        locator: &Locator,
        action: ElementAction,
        value: Option<&str>,
        timeout: Duration,
    ) -> Result<()> {
        match action {
            ElementAction::Click => {
                self.poll_and_act(
                    locator,
                    "el.scrollIntoView({block: 'center'}); el.click();",
                    timeout,
                )
                .await
            }
            ElementAction::Type => {
                let text = value.ok_or_else(|| {
                    Error::InvalidArgs("type action requires a value".to_string())
                })?;
                self.poll_and_act(
                    locator,
                    "el.scrollIntoView({block: 'center'}); el.focus(); if ('value' in el) el.value = '';",
                    timeout,
                )
                .await?;
                self.cdp.insert_text(text).await
            }
        }
    }

    async fn evaluate(&mut self, code: &str, args: &[Value]) -> Result<Value> {
        // The body may use `return` and `arguments`, matching the
        // execute-script convention callers already know.
        let args_json = serde_json::to_string(args)?;
        let expr = format!("(function() {{ {} }}).apply(null, {})", code, args_json);
        self.cdp.evaluate(&expr).await
    }

    async fn capture(&mut self, opts: &CaptureOptions) -> Result<Artifact> {
        let data = self.cdp.screenshot(opts.full_page).await?;
        Ok(Artifact {
            format: "png".to_string(),
            data,
        })
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.cdp.close_browser().await {
            debug!("Browser.close failed (may already be gone): {}", e);
        }
        let _ = self.child.kill().await;
        Ok(())
    }
}

impl Drop for CdpHandle {
    fn drop(&mut self) {
        // Best-effort kill if close was never called.
        let _ = self.child.start_kill();
    }
}
