//! Plugin subsystem.
//!
//! External capability packages contribute named tools to the dispatch
//! table. Plugins are validated defensively at load time, loaded with
//! per-source failure isolation, and invoked through a restricted
//! context that exposes a session accessor and nothing else. A broken
//! plugin takes down its own tools, not the process.

pub mod context;
pub mod diagnostics;
pub mod host;
pub mod loader;
pub mod manifest;
pub mod script;

use async_trait::async_trait;
use serde_json::Value;

use webpilot_core::Result;

pub use context::PluginContext;
pub use diagnostics::DiagnosticsPlugin;
pub use host::{PluginHost, PluginInfo};
pub use loader::{LoadFailure, LoadReport};
pub use manifest::{PluginManifest, ToolSpec};
pub use script::ScriptPlugin;

/// An external capability package.
///
/// The manifest's tool list is the handler table: `handle` is called
/// only with tool names the manifest declares, and must cover all of
/// them. Lifecycle hooks are optional; a failing `initialize` flags the
/// plugin as degraded but does not unregister it.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn manifest(&self) -> &PluginManifest;

    async fn initialize(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// Execute one of this plugin's declared tools.
    async fn handle(&self, tool: &str, args: Value, ctx: &PluginContext) -> Result<Value>;
}
