use serde_json::Value;

use crate::app;

/// Execute one tool call and print the response envelope.
pub async fn run(tool_name: &str, args_json: &str) -> anyhow::Result<()> {
    let args: Value = serde_json::from_str(args_json)
        .map_err(|e| anyhow::anyhow!("failed to parse --args JSON: {}\nInput: {}", e, args_json))?;

    let app = app::bootstrap().await?;
    let response = app.registry.dispatch(tool_name, app.ctx(), args).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    app.shutdown().await;

    if response.success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
