//! Automation Driver boundary.
//!
//! The rest of the system only ever talks to a browser through the
//! [`Driver`] / [`DriverHandle`] trait pair: open, navigate,
//! locate-and-act, evaluate, capture, close. Every call is fallible and
//! potentially slow (a process or network round-trip). The shipped
//! backend drives Chrome/Edge/Firefox over the DevTools protocol; tests
//! use the scriptable mock in [`testing`].

pub mod cdp;
pub mod chrome;
pub mod launch;
pub mod testing;

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use webpilot_core::Result;

pub use chrome::CdpDriver;

/// How to find an element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorStrategy {
    Css,
    XPath,
    Text,
}

impl LocatorStrategy {
    /// Parse a caller-supplied `by` value. Unrecognized values fall back
    /// to CSS, the dominant strategy in practice.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "xpath" => Self::XPath,
            "text" => Self::Text,
            _ => Self::Css,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::Css,
            value: value.into(),
        }
    }

    pub fn new(by: Option<&str>, value: impl Into<String>) -> Self {
        Self {
            strategy: by.map(LocatorStrategy::from_str).unwrap_or(LocatorStrategy::Css),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.strategy.name(), self.value)
    }
}

/// What to do with a located element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    /// Focus the element and type the accompanying value into it.
    Type,
}

/// Options for opening a new browser instance.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub engine: String,
    pub headless: bool,
    pub width: u32,
    pub height: u32,
    /// Explicit binary path; auto-discovered when `None`.
    pub binary: Option<String>,
    /// Profile directory for the instance. A temp-style per-session dir
    /// is derived from the session id when `None`.
    pub profile_dir: Option<PathBuf>,
    /// How long to wait for the debug endpoint after launch.
    pub open_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            engine: "chrome".to_string(),
            headless: true,
            width: 1280,
            height: 720,
            binary: None,
            profile_dir: None,
            open_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    pub full_page: bool,
}

/// A captured page artifact (screenshot), base64-encoded.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub format: String,
    pub data: String,
}

/// Factory for browser instances.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn open(&self, opts: &OpenOptions) -> Result<Box<dyn DriverHandle>>;
}

/// One live browser instance.
///
/// Calls take `&mut self`: a handle is never safe under concurrent use,
/// and the session layer serializes access through a mutex.
#[async_trait]
pub trait DriverHandle: Send + Sync {
    /// Navigate to a URL and wait for the document to settle.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Locate an element (polling until `timeout`) and act on it.
    /// `value` is required for [`ElementAction::Type`].
    async fn locate_and_act(
        &mut self,
        locator: &Locator,
        action: ElementAction,
        value: Option<&str>,
        timeout: Duration,
    ) -> Result<()>;

    /// Evaluate a script body in the page. The body may use `return`
    /// and access `arguments` bound from `args`.
    async fn evaluate(&mut self, code: &str, args: &[Value]) -> Result<Value>;

    /// Capture a screenshot of the current page.
    async fn capture(&mut self, opts: &CaptureOptions) -> Result<Artifact>;

    /// Shut the instance down. Idempotent best-effort.
    async fn close(&mut self) -> Result<()>;
}
