//! Rhai-script-backed plugins.
//!
//! A script plugin is a directory: `plugin.yaml` plus one handler
//! script per declared tool (`<tool>.rhai` unless the manifest says
//! otherwise). Handlers are compiled at load time, so "a handler for
//! every declared tool" is checked before registration, and executed
//! under operation and wall-clock limits.
//!
//! Scripts see two scope variables: `args` (the caller's arguments) and
//! `session` (a read-only metadata snapshot for `args.browserId`, or
//! `()` when absent). Scripts are synchronous and cannot reach the
//! driver; native plugins get the full async session accessor.

use async_trait::async_trait;
use rhai::{Dynamic, Engine, EvalAltResult, Scope, AST};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use webpilot_core::{Error, Result};

use crate::context::PluginContext;
use crate::manifest::PluginManifest;
use crate::Plugin;

const MAX_OPERATIONS: u64 = 100_000;
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct ScriptPlugin {
    manifest: PluginManifest,
    handlers: HashMap<String, AST>,
}

impl ScriptPlugin {
    /// Load and fully validate a plugin directory. Any structural
    /// problem (missing manifest, bad YAML, missing or non-compiling
    /// handler) fails the whole source.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join("plugin.yaml");
        if !manifest_path.exists() {
            return Err(Error::Plugin(format!(
                "{}: no plugin.yaml",
                dir.display()
            )));
        }
        let content = std::fs::read_to_string(&manifest_path)?;
        let manifest: PluginManifest =
            serde_yaml::from_str(&content).map_err(|e| Error::Yaml(e.to_string()))?;
        manifest.validate()?;

        let engine = base_engine();
        let mut handlers = HashMap::new();
        for tool in &manifest.tools {
            let script_path = dir.join(manifest.handler_file(&tool.name));
            if !script_path.exists() {
                return Err(Error::Plugin(format!(
                    "plugin '{}': tool '{}' has no handler script at {}",
                    manifest.name,
                    tool.name,
                    script_path.display()
                )));
            }
            let source = std::fs::read_to_string(&script_path)?;
            let ast = engine.compile(&source).map_err(|e| {
                Error::Plugin(format!(
                    "plugin '{}': handler for '{}' does not compile: {}",
                    manifest.name, tool.name, e
                ))
            })?;
            handlers.insert(tool.name.clone(), ast);
        }

        debug!(plugin = %manifest.name, tools = handlers.len(), "Script plugin loaded");
        Ok(Self { manifest, handlers })
    }
}

fn base_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_max_string_size(1_000_000);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(10_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine
}

/// Fresh engine with per-run operation and wall-clock limits.
fn limited_engine() -> Engine {
    let mut engine = base_engine();
    let operations = Arc::new(AtomicU64::new(0));
    let start = Instant::now();
    engine.on_progress(move |_| {
        let count = operations.fetch_add(1, Ordering::Relaxed);
        if count >= MAX_OPERATIONS {
            return Some(Dynamic::from(format!(
                "operation limit exceeded: {}",
                MAX_OPERATIONS
            )));
        }
        if start.elapsed() > SCRIPT_TIMEOUT {
            return Some(Dynamic::from(format!(
                "timeout exceeded: {}s",
                SCRIPT_TIMEOUT.as_secs()
            )));
        }
        None
    });
    engine
}

#[async_trait]
impl Plugin for ScriptPlugin {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn handle(&self, tool: &str, args: Value, ctx: &PluginContext) -> Result<Value> {
        let ast = self
            .handlers
            .get(tool)
            .ok_or_else(|| Error::ToolNotFound(tool.to_string()))?;

        // Resolve the session snapshot before entering the script.
        let session: Value = match args.get("browserId").and_then(|v| v.as_str()) {
            Some(id) => match ctx.session_summary(id).await {
                Some(summary) => serde_json::to_value(summary)?,
                None => Value::Null,
            },
            None => Value::Null,
        };

        let mut scope = Scope::new();
        scope.push_dynamic(
            "args",
            rhai::serde::to_dynamic(&args).map_err(|e| Error::PluginHandler(e.to_string()))?,
        );
        scope.push_dynamic(
            "session",
            rhai::serde::to_dynamic(&session).map_err(|e| Error::PluginHandler(e.to_string()))?,
        );

        let engine = limited_engine();
        match engine.eval_ast_with_scope::<Dynamic>(&mut scope, ast) {
            Ok(value) => rhai::serde::from_dynamic(&value)
                .map_err(|e| Error::PluginHandler(format!("unrepresentable result: {}", e))),
            Err(e) => {
                if let EvalAltResult::ErrorTerminated(ref reason, _) = *e {
                    return Err(Error::PluginHandler(format!("terminated: {}", reason)));
                }
                Err(Error::PluginHandler(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use webpilot_driver::testing::MockDriver;
    use webpilot_driver::OpenOptions;
    use webpilot_session::SessionRegistry;

    fn write_plugin(dir: &Path, script: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("plugin.yaml"),
            "name: greeter\nversion: '1.0'\ndescription: greets\ntools:\n  - name: greet\n",
        )
        .unwrap();
        fs::write(dir.join("greet.rhai"), script).unwrap();
    }

    async fn ctx_with_session(id: &str) -> PluginContext {
        let registry = Arc::new(SessionRegistry::new(Arc::new(MockDriver::new())));
        registry
            .create(Some(id), &OpenOptions::default(), Some("demo".into()))
            .await
            .unwrap();
        PluginContext::new(registry)
    }

    #[tokio::test]
    async fn test_handler_sees_args() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("greeter");
        write_plugin(&dir, r#""hello " + args.name"#);
        let plugin = ScriptPlugin::from_dir(&dir).unwrap();
        let result = plugin
            .handle("greet", json!({"name": "ada"}), &ctx_with_session("s").await)
            .await
            .unwrap();
        assert_eq!(result, json!("hello ada"));
    }

    #[tokio::test]
    async fn test_handler_sees_session_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("greeter");
        write_plugin(&dir, r#"if session == () { "none" } else { session.id }"#);
        let plugin = ScriptPlugin::from_dir(&dir).unwrap();
        let ctx = ctx_with_session("b7").await;

        let result = plugin
            .handle("greet", json!({"browserId": "b7"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result, json!("b7"));

        let result = plugin
            .handle("greet", json!({"browserId": "nope"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result, json!("none"));
    }

    #[tokio::test]
    async fn test_runaway_script_terminated() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("greeter");
        write_plugin(&dir, "let n = 0; loop { n += 1; }");
        let plugin = ScriptPlugin::from_dir(&dir).unwrap();
        let err = plugin
            .handle("greet", json!({}), &ctx_with_session("s").await)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PluginHandler(_)));
        assert!(err.to_string().contains("terminated"));
    }

    #[test]
    fn test_non_compiling_handler_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("greeter");
        write_plugin(&dir, "let x = ");
        let err = ScriptPlugin::from_dir(&dir).unwrap_err();
        assert!(err.to_string().contains("does not compile"));
    }

    #[test]
    fn test_missing_manifest_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("empty");
        fs::create_dir_all(&dir).unwrap();
        let err = ScriptPlugin::from_dir(&dir).unwrap_err();
        assert!(err.to_string().contains("no plugin.yaml"));
    }
}
