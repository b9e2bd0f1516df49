use crate::app;

/// List every registered tool, built-in and plugin-contributed.
pub async fn list(schemas: bool) -> anyhow::Result<()> {
    let app = app::bootstrap().await?;

    if schemas {
        println!("{}", serde_json::to_string_pretty(&app.registry.tool_schemas())?);
    } else {
        for schema in app.registry.tool_schemas() {
            println!(
                "{:<32} {}",
                schema["name"].as_str().unwrap_or_default(),
                schema["description"].as_str().unwrap_or_default()
            );
        }
    }

    app.shutdown().await;
    Ok(())
}
