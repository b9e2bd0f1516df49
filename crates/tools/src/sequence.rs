//! The action-sequence tool.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use webpilot_core::{Error, Result};
use webpilot_session::{run_sequence, ActionStep, ErrorPolicy};

use crate::{required_str, Tool, ToolContext, ToolSchema};

pub struct ExecuteActionSequenceTool;

// "steps" is accepted as an alias for "actions".
fn step_list(params: &Value) -> Option<&Value> {
    params
        .get("actions")
        .or_else(|| params.get("steps"))
        .filter(|v| v.is_array())
}

#[async_trait]
impl Tool for ExecuteActionSequenceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "execute_action_sequence",
            description: "Run an ordered list of steps (navigate, click, type_text, \
                          evaluate, screenshot, wait) against one browser session. \
                          Step failures are recorded in the report; the run halts \
                          after a failure only when stopOnError is set and \
                          continueOnError is not.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "browserId": { "type": "string" },
                    "actions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "kind": { "type": "string" },
                                "url": { "type": "string" },
                                "selector": { "type": "string" },
                                "by": { "type": "string" },
                                "value": { "type": "string" },
                                "timeoutMs": { "type": "integer" },
                                "description": { "type": "string" }
                            },
                            "required": ["kind"]
                        }
                    },
                    "continueOnError": { "type": "boolean" },
                    "stopOnError": { "type": "boolean" }
                },
                "required": ["browserId", "actions"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "browserId")?;
        if step_list(params).is_none() {
            return Err(Error::InvalidArgs(
                "'actions' must be an array".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let id = required_str(&params, "browserId")?;
        let raw = step_list(&params)
            .ok_or_else(|| Error::InvalidArgs("'actions' must be an array".to_string()))?;
        let steps: Vec<ActionStep> = serde_json::from_value(raw.clone())
            .map_err(|e| Error::InvalidArgs(format!("malformed actions: {}", e)))?;
        let policy = ErrorPolicy {
            continue_on_error: params
                .get("continueOnError")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            stop_on_error: params
                .get("stopOnError")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        };
        let default_timeout = Duration::from_millis(ctx.config.engine.step_timeout_ms);

        let session = ctx.sessions.require(id).await?;
        info!(session = %id, steps = steps.len(), "Running action sequence");
        let report = run_sequence(&session, &steps, policy, default_timeout).await;

        // Step failures are part of the report, not a tool error.
        Ok(json!({
            "message": report.summary(),
            "report": report,
        }))
    }
}
