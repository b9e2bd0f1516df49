//! Plugin tools exposed as local `Tool` implementations.
//!
//! Every plugin tool enters the dispatch table under the qualified name
//! `<plugin>__<tool>`, so plugin tools can never shadow built-ins or
//! each other.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use webpilot_core::Result;
use webpilot_plugins::{PluginContext, PluginHost, ToolSpec};

use crate::{Tool, ToolContext, ToolSchema};

pub struct PluginToolWrapper {
    /// Qualified name, leaked once at construction time.
    schema_name: &'static str,
    /// Description, leaked once at construction time.
    schema_desc: &'static str,
    plugin_name: String,
    /// Unqualified tool name used when invoking the plugin.
    tool_name: String,
    parameters: Value,
    host: Arc<PluginHost>,
}

impl PluginToolWrapper {
    pub fn new(plugin_name: String, spec: ToolSpec, host: Arc<PluginHost>) -> Self {
        let qualified = format!("{}__{}", plugin_name, spec.name);
        let schema_name: &'static str = Box::leak(qualified.into_boxed_str());
        let schema_desc: &'static str = Box::leak(spec.description.into_boxed_str());
        Self {
            schema_name,
            schema_desc,
            plugin_name,
            tool_name: spec.name,
            parameters: spec.parameters,
            host,
        }
    }
}

#[async_trait::async_trait]
impl Tool for PluginToolWrapper {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.schema_name,
            description: self.schema_desc,
            parameters: self.parameters.clone(),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        debug!(plugin = %self.plugin_name, tool = %self.tool_name, "Invoking plugin tool");
        let plugin_ctx = PluginContext::new(ctx.sessions.clone());
        self.host
            .invoke(&self.plugin_name, &self.tool_name, params, &plugin_ctx)
            .await
    }
}
