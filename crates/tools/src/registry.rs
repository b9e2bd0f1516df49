use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use webpilot_core::{Error, Result, ToolResponse};
use webpilot_plugins::PluginHost;

use crate::browser::{
    ClickElementTool, CloseBrowserTool, ExecuteScriptTool, ListBrowsersTool, NavigateToTool,
    OpenBrowserTool, TakeScreenshotTool, TypeTextTool,
};
use crate::plugin_bridge::PluginToolWrapper;
use crate::sequence::ExecuteActionSequenceTool;
use crate::{Tool, ToolContext};

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with every built-in browser tool.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: Vec<Arc<dyn Tool>> = vec![
            // Session lifecycle
            Arc::new(OpenBrowserTool),
            Arc::new(CloseBrowserTool),
            Arc::new(ListBrowsersTool),
            // Page primitives
            Arc::new(NavigateToTool),
            Arc::new(ClickElementTool),
            Arc::new(TypeTextTool),
            Arc::new(ExecuteScriptTool),
            Arc::new(TakeScreenshotTool),
            // Sequence engine
            Arc::new(ExecuteActionSequenceTool),
        ];
        for tool in builtins {
            registry
                .register(tool)
                .expect("built-in tool names are distinct");
        }
        registry
    }

    /// Register a tool. Duplicate names are rejected; the existing
    /// registration is never silently replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let schema = tool.schema();
        if self.tools.contains_key(schema.name) {
            return Err(Error::NameCollision(format!(
                "tool '{}' is already registered",
                schema.name
            )));
        }
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
        Ok(())
    }

    /// Register every tool the plugin host exposes, qualified as
    /// `<plugin>__<tool>`. A colliding name skips that one tool and is
    /// logged; it never unloads the plugin or stops the merge.
    pub fn absorb_plugins(&mut self, host: &Arc<PluginHost>) {
        for (plugin_name, spec) in host.tool_entries() {
            let wrapper = PluginToolWrapper::new(plugin_name.clone(), spec, host.clone());
            if let Err(e) = self.register(Arc::new(wrapper)) {
                warn!(plugin = %plugin_name, error = %e, "Skipping plugin tool");
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Schemas for every registered tool, in name order.
    pub fn tool_schemas(&self) -> Vec<Value> {
        self.tool_names()
            .iter()
            .map(|name| {
                let schema = self.tools[name].schema();
                json!({
                    "name": schema.name,
                    "description": schema.description,
                    "parameters": schema.parameters,
                })
            })
            .collect()
    }

    /// Execute a tool by name. Every outcome, including an unknown
    /// name, a validation failure and a handler error, comes back as
    /// the same response envelope; dispatch itself never fails.
    pub async fn dispatch(&self, name: &str, ctx: ToolContext, params: Value) -> ToolResponse {
        let tool = match self.get(name) {
            Some(tool) => tool,
            None => {
                warn!(tool = name, "Unknown tool requested");
                return ToolResponse::from(Error::ToolNotFound(name.to_string()));
            }
        };

        if let Err(e) = tool.validate(&params) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return ToolResponse::from(e);
        }

        debug!(tool = name, "Executing tool");
        match tool.execute(ctx, params).await {
            Ok(mut data) => {
                // The message lives in the envelope only; lifting it
                // removes it from the payload.
                let message = data
                    .as_object_mut()
                    .and_then(|obj| obj.remove("message"))
                    .and_then(|m| match m {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .unwrap_or_else(|| format!("{} completed", name));
                let data = match data {
                    Value::Object(obj) if obj.is_empty() => None,
                    other => Some(other),
                };
                ToolResponse::ok(message, data)
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Tool failed");
                ToolResponse::from(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;
    use webpilot_core::Config;
    use webpilot_driver::testing::{MockBehavior, MockDriver};
    use webpilot_plugins::DiagnosticsPlugin;
    use webpilot_session::SessionRegistry;

    use crate::ToolSchema;

    fn ctx_with(driver: MockDriver) -> ToolContext {
        ToolContext {
            sessions: Arc::new(SessionRegistry::new(Arc::new(driver))),
            config: Config::default(),
            artifacts_dir: std::env::temp_dir().join("webpilot-test-artifacts"),
        }
    }

    fn ctx() -> ToolContext {
        ctx_with(MockDriver::new())
    }

    struct NoopTool(&'static str);

    #[async_trait]
    impl Tool for NoopTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.0,
                description: "noop",
                parameters: json!({ "type": "object", "properties": {} }),
            }
        }

        fn validate(&self, _params: &Value) -> webpilot_core::Result<()> {
            Ok(())
        }

        async fn execute(
            &self,
            _ctx: ToolContext,
            _params: Value,
        ) -> webpilot_core::Result<Value> {
            Ok(json!({ "message": "noop done" }))
        }
    }

    #[test]
    fn test_builtins_present() {
        let reg = ToolRegistry::with_builtins();
        let names = reg.tool_names();
        for expected in [
            "open_browser",
            "navigate_to",
            "click_element",
            "type_text",
            "execute_script",
            "take_screenshot",
            "execute_action_sequence",
            "close_browser",
            "list_browsers",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(NoopTool("dup"))).unwrap();
        let err = reg.register(Arc::new(NoopTool("dup"))).unwrap_err();
        assert!(matches!(err, Error::NameCollision(_)));
        assert_eq!(reg.tool_names().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failure_envelope() {
        let reg = ToolRegistry::with_builtins();
        let resp = reg.dispatch("warp_drive", ctx(), json!({})).await;
        assert!(!resp.success);
        assert!(resp.message.contains("warp_drive"));
        assert!(resp.data.is_none());
    }

    #[tokio::test]
    async fn test_open_then_list_then_close() {
        let reg = ToolRegistry::with_builtins();
        let ctx = ctx();

        let resp = reg
            .dispatch("open_browser", ctx.clone(), json!({"browserId": "b1"}))
            .await;
        assert!(resp.success, "{}", resp.message);
        assert_eq!(resp.data.as_ref().unwrap()["session"]["id"], "b1");

        let resp = reg.dispatch("list_browsers", ctx.clone(), json!({})).await;
        assert!(resp.success);
        assert_eq!(
            resp.data.as_ref().unwrap()["sessions"]
                .as_array()
                .unwrap()
                .len(),
            1
        );

        let resp = reg
            .dispatch("close_browser", ctx.clone(), json!({"browserId": "b1"}))
            .await;
        assert!(resp.success);

        // Idempotent: closing again still succeeds.
        let resp = reg
            .dispatch("close_browser", ctx.clone(), json!({"browserId": "b1"}))
            .await;
        assert!(resp.success);

        let resp = reg.dispatch("list_browsers", ctx, json!({})).await;
        assert_eq!(
            resp.data.as_ref().unwrap()["sessions"]
                .as_array()
                .unwrap()
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn test_duplicate_open_fails_and_keeps_original() {
        let reg = ToolRegistry::with_builtins();
        let ctx = ctx();
        assert!(
            reg.dispatch("open_browser", ctx.clone(), json!({"browserId": "b1"}))
                .await
                .success
        );
        let resp = reg
            .dispatch("open_browser", ctx.clone(), json!({"browserId": "b1"}))
            .await;
        assert!(!resp.success);
        assert!(resp.message.contains("Duplicate session id"));

        // Original session still dispatchable.
        let resp = reg
            .dispatch(
                "navigate_to",
                ctx,
                json!({"browserId": "b1", "url": "https://example.com"}),
            )
            .await;
        assert!(resp.success);
    }

    #[tokio::test]
    async fn test_message_lifted_out_of_data_payload() {
        let reg = ToolRegistry::with_builtins();
        let ctx = ctx();
        reg.dispatch("open_browser", ctx.clone(), json!({"browserId": "b1"}))
            .await;

        let resp = reg
            .dispatch(
                "navigate_to",
                ctx.clone(),
                json!({"browserId": "b1", "url": "https://example.com"}),
            )
            .await;
        assert!(resp.success);
        assert_eq!(resp.message, "navigated to https://example.com");
        let data = resp.data.as_ref().unwrap();
        assert!(data.get("message").is_none());
        assert_eq!(data["url"], "https://example.com");

        // A payload carrying nothing but its message folds to no data.
        let resp = reg
            .dispatch(
                "click_element",
                ctx,
                json!({"browserId": "b1", "selector": "#ok"}),
            )
            .await;
        assert!(resp.success);
        assert!(resp.data.is_none());
    }

    #[tokio::test]
    async fn test_navigate_to_unknown_session() {
        let reg = ToolRegistry::with_builtins();
        let resp = reg
            .dispatch(
                "navigate_to",
                ctx(),
                json!({"browserId": "ghost", "url": "https://x"}),
            )
            .await;
        assert!(!resp.success);
        assert!(resp.message.contains("Session not found"));
    }

    #[tokio::test]
    async fn test_validation_failure_envelope() {
        let reg = ToolRegistry::with_builtins();
        let resp = reg
            .dispatch("navigate_to", ctx(), json!({"browserId": "b1"}))
            .await;
        assert!(!resp.success);
        assert!(resp.message.contains("'url' is required"));
    }

    #[tokio::test]
    async fn test_click_failure_surfaces_driver_message() {
        let reg = ToolRegistry::with_builtins();
        let ctx = ctx_with(MockDriver::with_behavior(MockBehavior {
            failing_selectors: vec!["#missing".to_string()],
            ..Default::default()
        }));
        reg.dispatch("open_browser", ctx.clone(), json!({"browserId": "b1"}))
            .await;
        let resp = reg
            .dispatch(
                "click_element",
                ctx,
                json!({"browserId": "b1", "selector": "#missing", "timeout": 200}),
            )
            .await;
        assert!(!resp.success);
        assert!(resp.message.contains("element not found"));
    }

    #[tokio::test]
    async fn test_sequence_tool_reports_partial_failure() {
        let reg = ToolRegistry::with_builtins();
        let ctx = ctx_with(MockDriver::with_behavior(MockBehavior {
            failing_selectors: vec!["#missing".to_string()],
            ..Default::default()
        }));
        reg.dispatch("open_browser", ctx.clone(), json!({"browserId": "b1"}))
            .await;
        let resp = reg
            .dispatch(
                "execute_action_sequence",
                ctx,
                json!({
                    "browserId": "b1",
                    "stopOnError": true,
                    "actions": [
                        { "kind": "navigate", "url": "https://x" },
                        { "kind": "click", "selector": "#missing", "timeoutMs": 200 },
                        { "kind": "click", "selector": "#after" }
                    ]
                }),
            )
            .await;
        // The tool itself succeeds; failures live in the report.
        assert!(resp.success);
        let report = &resp.data.as_ref().unwrap()["report"];
        assert_eq!(report["outcomes"].as_array().unwrap().len(), 2);
        assert_eq!(report["success"], false);
        assert_eq!(resp.message, "1 of 2 steps succeeded");
    }

    #[tokio::test]
    async fn test_execute_script_returns_value() {
        let reg = ToolRegistry::with_builtins();
        let ctx = ctx_with(MockDriver::with_behavior(MockBehavior {
            evaluate_result: Some(json!(42)),
            ..Default::default()
        }));
        reg.dispatch("open_browser", ctx.clone(), json!({"browserId": "b1"}))
            .await;
        let resp = reg
            .dispatch(
                "execute_script",
                ctx,
                json!({"browserId": "b1", "script": "return 6 * 7;"}),
            )
            .await;
        assert!(resp.success);
        assert_eq!(resp.data.as_ref().unwrap()["result"], 42);
    }

    #[tokio::test]
    async fn test_plugin_tools_are_namespaced() {
        let mut host = PluginHost::new();
        host.register(Arc::new(DiagnosticsPlugin::new())).unwrap();
        let host = Arc::new(host);

        let mut reg = ToolRegistry::with_builtins();
        reg.absorb_plugins(&host);
        let names = reg.tool_names();
        assert!(names.contains(&"diagnostics__page_title".to_string()));
        assert!(names.contains(&"diagnostics__show_label".to_string()));
        // Unqualified plugin tool names are not dispatchable.
        assert!(!names.contains(&"page_title".to_string()));
    }

    #[tokio::test]
    async fn test_plugin_tool_dispatch_end_to_end() {
        let mut host = PluginHost::new();
        host.register(Arc::new(DiagnosticsPlugin::new())).unwrap();
        let host = Arc::new(host);

        let mut reg = ToolRegistry::with_builtins();
        reg.absorb_plugins(&host);

        let ctx = ctx_with(MockDriver::with_behavior(MockBehavior {
            evaluate_result: Some(json!("Example Domain")),
            ..Default::default()
        }));
        reg.dispatch("open_browser", ctx.clone(), json!({"browserId": "b1"}))
            .await;
        let resp = reg
            .dispatch(
                "diagnostics__page_title",
                ctx.clone(),
                json!({"browserId": "b1"}),
            )
            .await;
        assert!(resp.success, "{}", resp.message);
        assert_eq!(resp.data.as_ref().unwrap()["title"], "Example Domain");

        // Plugin failure comes back as a failure envelope, not an Err.
        let resp = reg
            .dispatch(
                "diagnostics__page_title",
                ctx,
                json!({"browserId": "ghost"}),
            )
            .await;
        assert!(!resp.success);
        assert!(resp.message.contains("diagnostics__page_title"));
    }
}
