//! Plugin manifest shape and validation.
//!
//! Manifests come from external sources (`plugin.yaml` in a plugin
//! directory, or a native plugin's declaration) and are treated as
//! untrusted input: every structural requirement is checked before the
//! plugin is registered.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use webpilot_core::{Error, Result};

/// One tool a plugin contributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON-schema-shaped description of the expected arguments.
    #[serde(default = "default_parameters")]
    pub parameters: Value,
}

fn default_parameters() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    /// Tool name -> handler script file, relative to the plugin dir.
    /// Tools without an entry default to `<tool>.rhai`.
    #[serde(default)]
    pub handlers: std::collections::HashMap<String, String>,
}

impl PluginManifest {
    /// Reject structurally invalid manifests: missing identity fields,
    /// an empty tool list, or duplicate tool names.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Plugin("manifest is missing a name".to_string()));
        }
        if self.version.trim().is_empty() {
            return Err(Error::Plugin(format!(
                "plugin '{}' is missing a version",
                self.name
            )));
        }
        if self.description.trim().is_empty() {
            return Err(Error::Plugin(format!(
                "plugin '{}' is missing a description",
                self.name
            )));
        }
        if self.tools.is_empty() {
            return Err(Error::Plugin(format!(
                "plugin '{}' declares no tools",
                self.name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(Error::Plugin(format!(
                    "plugin '{}' declares a tool without a name",
                    self.name
                )));
            }
            if !seen.insert(tool.name.as_str()) {
                return Err(Error::Plugin(format!(
                    "plugin '{}' declares tool '{}' twice",
                    self.name, tool.name
                )));
            }
        }
        Ok(())
    }

    pub fn declares_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    /// Handler script path for a tool, honoring the manifest override.
    pub fn handler_file(&self, tool: &str) -> String {
        self.handlers
            .get(tool)
            .cloned()
            .unwrap_or_else(|| format!("{}.rhai", tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PluginManifest {
        serde_yaml::from_str(
            r#"
name: weather
version: "1.0"
description: Weather lookups
tools:
  - name: current
    description: Current conditions
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_manifest_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut m = valid();
        m.name = String::new();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_missing_version_rejected() {
        let mut m = valid();
        m.version = "  ".to_string();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_empty_tool_list_rejected() {
        let mut m = valid();
        m.tools.clear();
        let err = m.validate().unwrap_err();
        assert!(err.to_string().contains("declares no tools"));
    }

    #[test]
    fn test_duplicate_tool_names_rejected() {
        let mut m = valid();
        m.tools.push(m.tools[0].clone());
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_handler_file_default_and_override() {
        let mut m = valid();
        assert_eq!(m.handler_file("current"), "current.rhai");
        m.handlers.insert("current".to_string(), "scripts/cur.rhai".to_string());
        assert_eq!(m.handler_file("current"), "scripts/cur.rhai");
    }

    #[test]
    fn test_tool_spec_default_parameters() {
        let spec: ToolSpec = serde_yaml::from_str("name: x").unwrap();
        assert_eq!(spec.parameters["type"], "object");
    }
}
