//! Process wiring: config, driver, sessions, plugins, dispatch table.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use webpilot_core::{Config, Paths};
use webpilot_driver::CdpDriver;
use webpilot_plugins::{loader, DiagnosticsPlugin, LoadReport, PluginContext, PluginHost};
use webpilot_session::SessionRegistry;
use webpilot_tools::{ToolContext, ToolRegistry};

pub struct App {
    pub registry: ToolRegistry,
    pub sessions: Arc<SessionRegistry>,
    pub plugins: Arc<PluginHost>,
    pub plugin_report: LoadReport,
    ctx: ToolContext,
}

impl App {
    pub fn ctx(&self) -> ToolContext {
        self.ctx.clone()
    }

    /// Release every live browser and run plugin cleanup hooks.
    pub async fn shutdown(&self) {
        self.sessions.close_all().await;
        self.plugins.teardown_all().await;
        info!("Shutdown complete");
    }
}

pub async fn bootstrap() -> anyhow::Result<App> {
    let paths = Paths::new();
    let config = Config::load(&paths)?;

    let driver = Arc::new(CdpDriver::new(paths.profiles_dir()));
    let sessions = Arc::new(SessionRegistry::new(driver));

    let mut host = PluginHost::new();
    let plugin_report = if config.plugins.enabled {
        if let Err(e) = host.register(Arc::new(DiagnosticsPlugin::new())) {
            warn!(error = %e, "Bundled diagnostics plugin rejected");
        }
        let mut dirs: Vec<PathBuf> = vec![paths.plugins_dir()];
        dirs.extend(config.plugins.dirs.iter().map(PathBuf::from));
        loader::load_from(&dirs, &mut host)
    } else {
        info!("Plugin loading disabled by config");
        LoadReport::default()
    };

    let plugins = Arc::new(host);
    plugins
        .initialize_all(&PluginContext::new(sessions.clone()))
        .await;

    let mut registry = ToolRegistry::with_builtins();
    registry.absorb_plugins(&plugins);
    info!(tools = registry.tool_names().len(), "Dispatch table ready");

    let ctx = ToolContext {
        sessions: sessions.clone(),
        config,
        artifacts_dir: paths.artifacts_dir(),
    };

    Ok(App {
        registry,
        sessions,
        plugins,
        plugin_report,
        ctx,
    })
}
