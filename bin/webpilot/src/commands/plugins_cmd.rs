use crate::app;

/// List loaded plugins and any per-source load failures.
pub async fn list() -> anyhow::Result<()> {
    let app = app::bootstrap().await?;

    let plugins = app.plugins.list();
    if plugins.is_empty() {
        println!("No plugins loaded.");
    }
    for info in &plugins {
        let status = if info.degraded { "degraded" } else { "ok" };
        println!(
            "{:<20} v{:<8} [{}] tools: {}",
            info.name,
            info.version,
            status,
            info.tools.join(", ")
        );
    }

    if !app.plugin_report.failures.is_empty() {
        println!();
        println!("Load failures:");
        for failure in &app.plugin_report.failures {
            println!("  {}: {}", failure.source, failure.reason);
        }
    }

    app.shutdown().await;
    Ok(())
}
