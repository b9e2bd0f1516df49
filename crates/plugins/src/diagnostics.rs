//! Bundled diagnostics plugin.
//!
//! Native (non-script) plugin that ships with the binary and doubles as
//! the reference for writing plugins in Rust: it goes through the same
//! registration, namespacing, and context paths as loaded ones.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use webpilot_core::{Error, Result};

use crate::context::PluginContext;
use crate::manifest::{PluginManifest, ToolSpec};
use crate::Plugin;

pub struct DiagnosticsPlugin {
    manifest: PluginManifest,
}

impl DiagnosticsPlugin {
    pub fn new() -> Self {
        let browser_params = json!({
            "type": "object",
            "properties": {
                "browserId": { "type": "string", "description": "Target browser session" }
            },
            "required": ["browserId"]
        });
        let manifest = PluginManifest {
            name: "diagnostics".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Inspect and visually tag live browser sessions".to_string(),
            tools: vec![
                ToolSpec {
                    name: "page_title".to_string(),
                    description: "Title of the current page".to_string(),
                    parameters: browser_params.clone(),
                },
                ToolSpec {
                    name: "page_url".to_string(),
                    description: "URL of the current page".to_string(),
                    parameters: browser_params.clone(),
                },
                ToolSpec {
                    name: "show_label".to_string(),
                    description: "Overlay the session's label on the page".to_string(),
                    parameters: browser_params,
                },
            ],
            handlers: Default::default(),
        };
        Self { manifest }
    }
}

impl Default for DiagnosticsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn browser_id(args: &Value) -> Result<&str> {
    args.get("browserId")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidArgs("browserId is required".to_string()))
}

/// Fixed-position banner so the overlay survives page layout.
const LABEL_BANNER_JS: &str = r#"
let banner = document.getElementById('__webpilot_label');
if (!banner) {
    banner = document.createElement('div');
    banner.id = '__webpilot_label';
    banner.style.cssText = 'position:fixed;top:0;left:0;z-index:2147483647;' +
        'background:#1a73e8;color:#fff;font:bold 14px sans-serif;' +
        'padding:4px 12px;border-radius:0 0 6px 0;';
    document.body.appendChild(banner);
}
banner.textContent = arguments[0];
return arguments[0];
"#;

#[async_trait]
impl Plugin for DiagnosticsPlugin {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn handle(&self, tool: &str, args: Value, ctx: &PluginContext) -> Result<Value> {
        let id = browser_id(&args)?;
        let session = ctx.session(id).await?;
        session.touch().await;
        debug!(tool = %tool, session = %id, "Diagnostics tool invoked");

        match tool {
            "page_title" => {
                let mut driver = session.driver.lock().await;
                let title = driver.evaluate("return document.title;", &[]).await?;
                Ok(json!({ "title": title }))
            }
            "page_url" => {
                let mut driver = session.driver.lock().await;
                let url = driver
                    .evaluate("return window.location.href;", &[])
                    .await?;
                Ok(json!({ "url": url }))
            }
            "show_label" => {
                let text = match session.label().await {
                    Some(label) => label,
                    None => session.id.clone(),
                };
                let mut driver = session.driver.lock().await;
                driver
                    .evaluate(LABEL_BANNER_JS, &[Value::String(text.clone())])
                    .await?;
                Ok(json!({ "shown": text }))
            }
            other => Err(Error::ToolNotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use webpilot_driver::testing::{MockBehavior, MockDriver};
    use webpilot_driver::OpenOptions;
    use webpilot_session::SessionRegistry;

    async fn ctx(behavior: MockBehavior, id: &str, label: Option<&str>) -> PluginContext {
        let registry = Arc::new(SessionRegistry::new(Arc::new(MockDriver::with_behavior(
            behavior,
        ))));
        registry
            .create(Some(id), &OpenOptions::default(), label.map(String::from))
            .await
            .unwrap();
        PluginContext::new(registry)
    }

    #[tokio::test]
    async fn test_page_title() {
        let behavior = MockBehavior {
            evaluate_result: Some(json!("Example Domain")),
            ..Default::default()
        };
        let plugin = DiagnosticsPlugin::new();
        let result = plugin
            .handle(
                "page_title",
                json!({"browserId": "b1"}),
                &ctx(behavior, "b1", None).await,
            )
            .await
            .unwrap();
        assert_eq!(result, json!({ "title": "Example Domain" }));
    }

    #[tokio::test]
    async fn test_page_url() {
        let behavior = MockBehavior {
            evaluate_result: Some(json!("https://example.com/")),
            ..Default::default()
        };
        let plugin = DiagnosticsPlugin::new();
        let result = plugin
            .handle(
                "page_url",
                json!({"browserId": "b1"}),
                &ctx(behavior, "b1", None).await,
            )
            .await
            .unwrap();
        assert_eq!(result["url"], "https://example.com/");
    }

    #[tokio::test]
    async fn test_show_label_prefers_label_over_id() {
        let plugin = DiagnosticsPlugin::new();
        let result = plugin
            .handle(
                "show_label",
                json!({"browserId": "b1"}),
                &ctx(MockBehavior::default(), "b1", Some("checkout flow")).await,
            )
            .await
            .unwrap();
        assert_eq!(result["shown"], "checkout flow");

        let result = plugin
            .handle(
                "show_label",
                json!({"browserId": "b2"}),
                &ctx(MockBehavior::default(), "b2", None).await,
            )
            .await
            .unwrap();
        assert_eq!(result["shown"], "b2");
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let plugin = DiagnosticsPlugin::new();
        let err = plugin
            .handle(
                "page_title",
                json!({"browserId": "ghost"}),
                &ctx(MockBehavior::default(), "b1", None).await,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_browser_id_rejected() {
        let plugin = DiagnosticsPlugin::new();
        let err = plugin
            .handle(
                "page_title",
                json!({}),
                &ctx(MockBehavior::default(), "b1", None).await,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgs(_)));
    }

    #[test]
    fn test_manifest_is_valid() {
        let plugin = DiagnosticsPlugin::new();
        assert!(plugin.manifest().validate().is_ok());
        assert!(plugin.manifest().declares_tool("show_label"));
    }
}
