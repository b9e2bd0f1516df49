//! Plugin registration and invocation.

use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use webpilot_core::{Error, Result};

use crate::context::PluginContext;
use crate::manifest::ToolSpec;
use crate::Plugin;

struct RegisteredPlugin {
    plugin: Arc<dyn Plugin>,
    /// Set when the initialize hook failed; the plugin stays registered
    /// but surfaces as degraded in listings.
    degraded: AtomicBool,
}

/// Registered-plugin summary for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub tools: Vec<String>,
    pub degraded: bool,
}

/// Owns every loaded plugin. Write-once at startup; read-only from then
/// on, so dispatch shares it behind a plain `Arc`.
#[derive(Default)]
pub struct PluginHost {
    plugins: Vec<RegisteredPlugin>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.plugins
            .iter()
            .find(|r| r.plugin.manifest().name == name)
    }

    /// Validate and register a plugin. A name collision rejects the
    /// newcomer; the already-registered plugin is untouched.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let manifest = plugin.manifest();
        manifest.validate()?;
        if self.find(&manifest.name).is_some() {
            return Err(Error::NameCollision(format!(
                "plugin '{}' is already registered",
                manifest.name
            )));
        }
        info!(
            plugin = %manifest.name,
            version = %manifest.version,
            tools = manifest.tools.len(),
            "Registered plugin"
        );
        self.plugins.push(RegisteredPlugin {
            plugin,
            degraded: AtomicBool::new(false),
        });
        Ok(())
    }

    /// Run every plugin's initialize hook once. Hook failures are
    /// logged and flag the plugin as degraded; they never unload it.
    pub async fn initialize_all(&self, ctx: &PluginContext) {
        for reg in &self.plugins {
            let name = reg.plugin.manifest().name.clone();
            if let Err(e) = reg.plugin.initialize(ctx).await {
                warn!(plugin = %name, error = %e, "Plugin initialize hook failed");
                reg.degraded.store(true, Ordering::Relaxed);
            }
        }
    }

    /// Run every plugin's cleanup hook. Failures are logged only.
    pub async fn teardown_all(&self) {
        for reg in &self.plugins {
            if let Err(e) = reg.plugin.cleanup().await {
                warn!(
                    plugin = %reg.plugin.manifest().name,
                    error = %e,
                    "Plugin cleanup hook failed"
                );
            }
        }
    }

    /// Invoke a plugin tool. Handler errors come back as
    /// `PluginHandler` with the original message preserved.
    pub async fn invoke(
        &self,
        plugin_name: &str,
        tool: &str,
        args: Value,
        ctx: &PluginContext,
    ) -> Result<Value> {
        let reg = self
            .find(plugin_name)
            .ok_or_else(|| Error::PluginNotFound(plugin_name.to_string()))?;
        if !reg.plugin.manifest().declares_tool(tool) {
            return Err(Error::ToolNotFound(format!("{}__{}", plugin_name, tool)));
        }
        reg.plugin
            .handle(tool, args, ctx)
            .await
            .map_err(|e| Error::PluginHandler(format!("{}__{}: {}", plugin_name, tool, e)))
    }

    pub fn list(&self) -> Vec<PluginInfo> {
        self.plugins
            .iter()
            .map(|reg| {
                let manifest = reg.plugin.manifest();
                PluginInfo {
                    name: manifest.name.clone(),
                    version: manifest.version.clone(),
                    description: manifest.description.clone(),
                    tools: manifest.tools.iter().map(|t| t.name.clone()).collect(),
                    degraded: reg.degraded.load(Ordering::Relaxed),
                }
            })
            .collect()
    }

    /// Every `(plugin, tool spec)` pair, for dispatch-table merging.
    pub fn tool_entries(&self) -> Vec<(String, ToolSpec)> {
        self.plugins
            .iter()
            .flat_map(|reg| {
                let manifest = reg.plugin.manifest();
                manifest
                    .tools
                    .iter()
                    .map(|t| (manifest.name.clone(), t.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
