//! Tool-invocation wire shapes.
//!
//! Every request is `{name, arguments}` and every response, success or
//! failure, built-in or plugin-backed, is the same `{success, message,
//! data?}` envelope, so callers never branch on tool provenance.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// One named tool invocation as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Normalized result envelope returned by every dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResponse {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl From<Error> for ToolResponse {
    fn from(err: Error) -> Self {
        Self::fail(err.to_string())
    }
}
