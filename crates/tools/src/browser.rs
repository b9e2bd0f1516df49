//! Built-in browser tools.
//!
//! Thin argument-mapping shims: each tool resolves its session, holds
//! the session's driver lock for exactly one primitive call, and
//! returns a JSON payload for the dispatch envelope.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use webpilot_core::Result;
use webpilot_driver::{CaptureOptions, ElementAction, Locator, OpenOptions};

use crate::{optional_str, required_str, Tool, ToolContext, ToolSchema};

fn browser_id_param() -> Value {
    json!({ "type": "string", "description": "Identifier of the target browser session" })
}

pub struct OpenBrowserTool;

#[async_trait]
impl Tool for OpenBrowserTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "open_browser",
            description: "Launch a new browser instance and register it as a session. \
                          Fails if the requested browserId is already in use.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "browserId": { "type": "string", "description": "Session id to bind; generated when omitted" },
                    "label": { "type": "string", "description": "Human-readable label for listings" },
                    "engine": { "type": "string", "enum": ["chrome", "edge", "firefox"] },
                    "headless": { "type": "boolean" },
                    "width": { "type": "integer" },
                    "height": { "type": "integer" }
                }
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let defaults = &ctx.config.browser;
        let opts = OpenOptions {
            engine: optional_str(&params, "engine")
                .unwrap_or(&defaults.engine)
                .to_string(),
            headless: params
                .get("headless")
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.headless),
            width: params
                .get("width")
                .and_then(|v| v.as_u64())
                .map(|w| w as u32)
                .unwrap_or(defaults.width),
            height: params
                .get("height")
                .and_then(|v| v.as_u64())
                .map(|h| h as u32)
                .unwrap_or(defaults.height),
            binary: defaults.binary.clone(),
            profile_dir: None,
            open_timeout: Duration::from_secs(ctx.config.engine.open_timeout_secs),
        };
        let label = optional_str(&params, "label").map(String::from);
        let session = ctx
            .sessions
            .create(optional_str(&params, "browserId"), &opts, label)
            .await?;
        info!(session = %session.id, engine = %opts.engine, "Browser opened");
        Ok(json!({
            "message": format!("opened browser session {}", session.id),
            "session": session.summary().await,
        }))
    }
}

pub struct NavigateToTool;

#[async_trait]
impl Tool for NavigateToTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "navigate_to",
            description: "Navigate a browser session to a URL and wait for the page to settle.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "browserId": browser_id_param(),
                    "url": { "type": "string" }
                },
                "required": ["browserId", "url"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "browserId")?;
        required_str(params, "url")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let id = required_str(&params, "browserId")?;
        let url = required_str(&params, "url")?;
        let session = ctx.sessions.require(id).await?;
        let mut driver = session.driver.lock().await;
        driver.navigate(url).await?;
        Ok(json!({ "message": format!("navigated to {}", url), "url": url }))
    }
}

pub struct ClickElementTool;

#[async_trait]
impl Tool for ClickElementTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "click_element",
            description: "Locate an element (polling until timeout) and click it.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "browserId": browser_id_param(),
                    "selector": { "type": "string" },
                    "by": { "type": "string", "enum": ["css", "xpath", "text"], "description": "Locator strategy, css by default" },
                    "timeout": { "type": "integer", "description": "Locate timeout in milliseconds" }
                },
                "required": ["browserId", "selector"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "browserId")?;
        required_str(params, "selector")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let id = required_str(&params, "browserId")?;
        let locator = Locator::new(
            optional_str(&params, "by"),
            required_str(&params, "selector")?,
        );
        let timeout = ctx.step_timeout(&params);
        let session = ctx.sessions.require(id).await?;
        let mut driver = session.driver.lock().await;
        driver
            .locate_and_act(&locator, ElementAction::Click, None, timeout)
            .await?;
        Ok(json!({ "message": format!("clicked {}", locator) }))
    }
}

pub struct TypeTextTool;

#[async_trait]
impl Tool for TypeTextTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "type_text",
            description: "Locate an element, focus it and type text into it.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "browserId": browser_id_param(),
                    "selector": { "type": "string" },
                    "text": { "type": "string" },
                    "by": { "type": "string", "enum": ["css", "xpath", "text"] },
                    "timeout": { "type": "integer" }
                },
                "required": ["browserId", "selector", "text"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "browserId")?;
        required_str(params, "selector")?;
        if params.get("text").and_then(|v| v.as_str()).is_none() {
            return Err(webpilot_core::Error::InvalidArgs(
                "'text' is required".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let id = required_str(&params, "browserId")?;
        let locator = Locator::new(
            optional_str(&params, "by"),
            required_str(&params, "selector")?,
        );
        // Empty text is allowed; it clears the field.
        let text = params
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let timeout = ctx.step_timeout(&params);
        let session = ctx.sessions.require(id).await?;
        let mut driver = session.driver.lock().await;
        driver
            .locate_and_act(&locator, ElementAction::Type, Some(text), timeout)
            .await?;
        Ok(json!({ "message": format!("typed into {}", locator) }))
    }
}

pub struct ExecuteScriptTool;

// "script" is accepted as an alias for "code".
fn script_body(params: &Value) -> Result<&str> {
    optional_str(params, "code")
        .or_else(|| optional_str(params, "script"))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| webpilot_core::Error::InvalidArgs("'code' is required".to_string()))
}

#[async_trait]
impl Tool for ExecuteScriptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "execute_script",
            description: "Evaluate a JavaScript body in the page and return its value. \
                          The body may use `return` and read `arguments`.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "browserId": browser_id_param(),
                    "code": { "type": "string" },
                    "args": { "type": "array", "description": "Values bound to `arguments` in the script" }
                },
                "required": ["browserId", "code"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "browserId")?;
        script_body(params)?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let id = required_str(&params, "browserId")?;
        let script = script_body(&params)?;
        let args: Vec<Value> = params
            .get("args")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let session = ctx.sessions.require(id).await?;
        let mut driver = session.driver.lock().await;
        let result = driver.evaluate(script, &args).await?;
        Ok(json!({ "message": "script evaluated", "result": result }))
    }
}

pub struct TakeScreenshotTool;

#[async_trait]
impl Tool for TakeScreenshotTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "take_screenshot",
            description: "Capture the current page as a PNG. Saved under the artifacts \
                          directory unless an explicit path is given.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "browserId": browser_id_param(),
                    "fullPage": { "type": "boolean", "description": "Capture beyond the viewport" },
                    "outputPath": { "type": "string", "description": "Explicit output file path" }
                },
                "required": ["browserId"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "browserId")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let id = required_str(&params, "browserId")?;
        let opts = CaptureOptions {
            full_page: params
                .get("fullPage")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        };
        let session = ctx.sessions.require(id).await?;
        let artifact = {
            let mut driver = session.driver.lock().await;
            driver.capture(&opts).await?
        };

        let path = match optional_str(&params, "outputPath").or_else(|| optional_str(&params, "path"))
        {
            Some(p) => std::path::PathBuf::from(p),
            None => {
                std::fs::create_dir_all(&ctx.artifacts_dir)?;
                ctx.artifacts_dir.join(format!(
                    "{}-{}.{}",
                    session.id,
                    chrono::Utc::now().format("%Y%m%d-%H%M%S"),
                    artifact.format
                ))
            }
        };
        std::fs::write(&path, decode_base64(&artifact.data)?)?;
        info!(session = %id, path = %path.display(), "Screenshot saved");
        Ok(json!({
            "message": format!("screenshot saved to {}", path.display()),
            "path": path.display().to_string(),
            "format": artifact.format,
        }))
    }
}

// Screenshot payloads come out of the driver already base64-encoded.
fn decode_base64(data: &str) -> Result<Vec<u8>> {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| webpilot_core::Error::Driver(format!("invalid screenshot payload: {}", e)))
}

pub struct CloseBrowserTool;

#[async_trait]
impl Tool for CloseBrowserTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "close_browser",
            description: "Close a browser session and release its resources. \
                          Closing an unknown or already-closed session is a no-op.",
            parameters: json!({
                "type": "object",
                "properties": { "browserId": browser_id_param() },
                "required": ["browserId"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "browserId")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let id = required_str(&params, "browserId")?;
        ctx.sessions.close(id).await;
        Ok(json!({ "message": format!("closed browser session {}", id) }))
    }
}

pub struct ListBrowsersTool;

#[async_trait]
impl Tool for ListBrowsersTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_browsers",
            description: "List all live browser sessions with their metadata.",
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, _params: Value) -> Result<Value> {
        let sessions = ctx.sessions.list().await;
        Ok(json!({
            "message": format!("{} live session(s)", sessions.len()),
            "sessions": sessions,
        }))
    }
}
