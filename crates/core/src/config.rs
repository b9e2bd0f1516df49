use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    /// Browser engine to launch: "chrome", "edge" or "firefox".
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Explicit browser binary path. Auto-discovered when unset.
    #[serde(default)]
    pub binary: Option<String>,
}

fn default_engine() -> String {
    "chrome".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            headless: default_headless(),
            width: default_width(),
            height: default_height(),
            binary: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Default per-step timeout for action sequences, milliseconds.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
    /// How long to wait for a freshly launched browser's debug endpoint.
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,
}

fn default_step_timeout_ms() -> u64 {
    10_000
}

fn default_open_timeout_secs() -> u64 {
    15
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: default_step_timeout_ms(),
            open_timeout_secs: default_open_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    #[serde(default = "default_plugins_enabled")]
    pub enabled: bool,
    /// Extra plugin directories scanned in addition to `~/.webpilot/plugins`.
    #[serde(default)]
    pub dirs: Vec<String>,
}

fn default_plugins_enabled() -> bool {
    true
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: default_plugins_enabled(),
            dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub plugins: PluginConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults
    /// when no file exists yet.
    pub fn load(paths: &Paths) -> Result<Self> {
        Self::load_from(&paths.config_file())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        // Config is JSON5 so hand-edited files may carry comments.
        json5::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, paths: &Paths) -> Result<()> {
        let path = paths.config_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.browser.engine, "chrome");
        assert!(config.browser.headless);
        assert_eq!(config.engine.step_timeout_ms, 10_000);
        assert!(config.plugins.enabled);
        assert!(config.plugins.dirs.is_empty());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            json5::from_str(r#"{ browser: { headless: false } }"#).unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.width, 1280);
        assert_eq!(config.engine.open_timeout_secs, 15);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load_from(Path::new("/nonexistent/webpilot.json")).unwrap();
        assert_eq!(config.browser.engine, "chrome");
    }
}
