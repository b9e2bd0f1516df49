//! Scriptable in-memory driver for tests.
//!
//! Records every primitive call in a shared journal and fails on demand
//! (specific selectors, specific URLs, artificial per-call delay), so
//! registry/engine/dispatch tests run without a browser.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use webpilot_core::{Error, Result};

use crate::{Artifact, CaptureOptions, Driver, DriverHandle, ElementAction, Locator, OpenOptions};

pub type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Every `open` call fails.
    pub fail_open: bool,
    /// Locators whose value matches one of these fail as "not found".
    pub failing_selectors: Vec<String>,
    /// URLs that fail to navigate.
    pub failing_urls: Vec<String>,
    /// Artificial delay before every handle call, for timeout tests.
    pub op_delay: Option<Duration>,
    /// Value returned by `evaluate`.
    pub evaluate_result: Option<Value>,
}

pub struct MockDriver {
    behavior: MockBehavior,
    journal: Journal,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::default())
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared journal of every call made through this driver's handles.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn open(&self, _opts: &OpenOptions) -> Result<Box<dyn DriverHandle>> {
        self.journal.lock().unwrap().push("open".to_string());
        if self.behavior.fail_open {
            return Err(Error::Driver("mock open failure".to_string()));
        }
        Ok(Box::new(MockHandle {
            behavior: self.behavior.clone(),
            journal: self.journal.clone(),
            closed: false,
        }))
    }
}

pub struct MockHandle {
    behavior: MockBehavior,
    journal: Journal,
    closed: bool,
}

impl MockHandle {
    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    async fn maybe_delay(&self) {
        if let Some(delay) = self.behavior.op_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DriverHandle for MockHandle {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.maybe_delay().await;
        self.record(format!("navigate {}", url));
        if self.behavior.failing_urls.iter().any(|u| u == url) {
            return Err(Error::Driver(format!("navigation failed: {}", url)));
        }
        Ok(())
    }

    async fn locate_and_act(
        &mut self,
        locator: &Locator,
        action: ElementAction,
        value: Option<&str>,
        _timeout: Duration,
    ) -> Result<()> {
        self.maybe_delay().await;
        match action {
            ElementAction::Click => self.record(format!("click {}", locator)),
            ElementAction::Type => {
                self.record(format!("type {} {}", locator, value.unwrap_or("")))
            }
        }
        if self
            .behavior
            .failing_selectors
            .iter()
            .any(|s| s == &locator.value)
        {
            return Err(Error::Timeout(format!("element not found: {}", locator)));
        }
        Ok(())
    }

    async fn evaluate(&mut self, code: &str, _args: &[Value]) -> Result<Value> {
        self.maybe_delay().await;
        self.record(format!("evaluate {}", code));
        Ok(self
            .behavior
            .evaluate_result
            .clone()
            .unwrap_or_else(|| json!("ok")))
    }

    async fn capture(&mut self, opts: &CaptureOptions) -> Result<Artifact> {
        self.maybe_delay().await;
        self.record(format!("capture full_page={}", opts.full_page));
        Ok(Artifact {
            format: "png".to_string(),
            data: "bW9jay1wbmc=".to_string(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.record("close".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let driver = MockDriver::new();
        let journal = driver.journal();
        let mut handle = driver.open(&OpenOptions::default()).await.unwrap();
        handle.navigate("https://example.com").await.unwrap();
        handle.close().await.unwrap();
        let entries = journal.lock().unwrap().clone();
        assert_eq!(entries, vec!["open", "navigate https://example.com", "close"]);
    }

    #[tokio::test]
    async fn test_mock_failing_selector() {
        let driver = MockDriver::with_behavior(MockBehavior {
            failing_selectors: vec!["#missing".to_string()],
            ..Default::default()
        });
        let mut handle = driver.open(&OpenOptions::default()).await.unwrap();
        let err = handle
            .locate_and_act(
                &Locator::css("#missing"),
                ElementAction::Click,
                None,
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("element not found"));
    }

    #[tokio::test]
    async fn test_mock_fail_open() {
        let driver = MockDriver::with_behavior(MockBehavior {
            fail_open: true,
            ..Default::default()
        });
        assert!(driver.open(&OpenOptions::default()).await.is_err());
    }
}
