//! Tool dispatch layer.
//!
//! Exposes every browser capability, built-in and plugin-contributed,
//! as a named tool behind one registry. Dispatch always answers with
//! the normalized `ToolResponse` envelope; internal errors never leak
//! out as anything else.

pub mod browser;
pub mod plugin_bridge;
pub mod registry;
pub mod sequence;

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use webpilot_core::{Config, Error, Result};
use webpilot_session::SessionRegistry;

pub use registry::ToolRegistry;

/// Shared state handed to every tool execution.
#[derive(Clone)]
pub struct ToolContext {
    pub sessions: Arc<SessionRegistry>,
    pub config: Config,
    /// Where screenshot artifacts land when the caller gives no path.
    pub artifacts_dir: PathBuf,
}

impl ToolContext {
    /// Per-step driver timeout, from config unless the caller overrode
    /// it with a `timeout` argument (milliseconds).
    pub fn step_timeout(&self, params: &Value) -> Duration {
        let ms = params
            .get("timeout")
            .and_then(|v| v.as_u64())
            .unwrap_or(self.config.engine.step_timeout_ms);
        Duration::from_millis(ms)
    }
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}

/// Extract a required string argument.
pub(crate) fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidArgs(format!("'{}' is required", key)))
}

pub(crate) fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}
