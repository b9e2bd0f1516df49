//! Plugin discovery from the filesystem.
//!
//! Each immediate subdirectory of a plugin directory is one candidate
//! source. A failure in one source (missing manifest, bad YAML, script
//! that does not compile, name collision) is recorded and the scan
//! moves on; one broken plugin never blocks the rest.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::host::PluginHost;
use crate::script::ScriptPlugin;
use crate::Plugin;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFailure {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

/// Scan `dirs` for plugin packages and register the valid ones.
pub fn load_from(dirs: &[PathBuf], host: &mut PluginHost) -> LoadReport {
    let mut report = LoadReport::default();

    for dir in dirs {
        if !dir.is_dir() {
            debug!(path = %dir.display(), "Plugin directory absent; skipping");
            continue;
        }
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                report.failures.push(LoadFailure {
                    source: dir.display().to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_one(&path, host, &mut report);
            }
        }
    }

    info!(
        loaded = report.loaded.len(),
        failed = report.failures.len(),
        "Plugin scan finished"
    );
    report
}

fn load_one(path: &Path, host: &mut PluginHost, report: &mut LoadReport) {
    let source = path.display().to_string();
    match ScriptPlugin::from_dir(path) {
        Ok(plugin) => {
            let name = plugin.manifest().name.clone();
            match host.register(Arc::new(plugin)) {
                Ok(()) => report.loaded.push(name),
                Err(e) => {
                    warn!(source = %source, error = %e, "Plugin rejected");
                    report.failures.push(LoadFailure {
                        source,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Err(e) => {
            warn!(source = %source, error = %e, "Plugin failed to load");
            report.failures.push(LoadFailure {
                source,
                reason: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_plugin(root: &Path, name: &str, script: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("plugin.yaml"),
            format!(
                "name: {}\nversion: '1.0'\ndescription: test\ntools:\n  - name: greet\n",
                name
            ),
        )
        .unwrap();
        fs::write(dir.join("greet.rhai"), script).unwrap();
    }

    #[test]
    fn test_loads_valid_plugins() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "alpha", r#""hello""#);
        write_plugin(tmp.path(), "beta", r#""hi""#);

        let mut host = PluginHost::new();
        let report = load_from(&[tmp.path().to_path_buf()], &mut host);
        assert_eq!(report.failures.len(), 0);
        let mut loaded = report.loaded.clone();
        loaded.sort();
        assert_eq!(loaded, vec!["alpha", "beta"]);
        assert_eq!(host.list().len(), 2);
    }

    #[test]
    fn test_malformed_source_does_not_block_others() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "good", r#""hello""#);
        // Broken source: manifest with no tools.
        let bad = tmp.path().join("bad");
        fs::create_dir_all(&bad).unwrap();
        fs::write(
            bad.join("plugin.yaml"),
            "name: bad\nversion: '1.0'\ndescription: broken\n",
        )
        .unwrap();

        let mut host = PluginHost::new();
        let report = load_from(&[tmp.path().to_path_buf()], &mut host);
        assert_eq!(report.loaded, vec!["good"]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].source.contains("bad"));
        assert!(report.failures[0].reason.contains("declares no tools"));
    }

    #[test]
    fn test_missing_handler_script_is_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("scriptless");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("plugin.yaml"),
            "name: scriptless\nversion: '1.0'\ndescription: no script\ntools:\n  - name: greet\n",
        )
        .unwrap();

        let mut host = PluginHost::new();
        let report = load_from(&[tmp.path().to_path_buf()], &mut host);
        assert!(report.loaded.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("handler"));
    }

    #[test]
    fn test_duplicate_name_across_sources_first_wins() {
        let tmp1 = tempfile::tempdir().unwrap();
        let tmp2 = tempfile::tempdir().unwrap();
        write_plugin(tmp1.path(), "dup", r#""first""#);
        write_plugin(tmp2.path(), "dup", r#""second""#);

        let mut host = PluginHost::new();
        let report = load_from(
            &[tmp1.path().to_path_buf(), tmp2.path().to_path_buf()],
            &mut host,
        );
        assert_eq!(report.loaded, vec!["dup"]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("already registered"));
        assert_eq!(host.list().len(), 1);
    }

    #[test]
    fn test_absent_directory_is_not_a_failure() {
        let mut host = PluginHost::new();
        let report = load_from(&[PathBuf::from("/nonexistent/plugins")], &mut host);
        assert!(report.loaded.is_empty());
        assert!(report.failures.is_empty());
    }
}
