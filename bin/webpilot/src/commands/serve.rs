//! Long-running tool server: one JSON request per stdin line, one JSON
//! response per stdout line. A malformed line gets a failure envelope;
//! the loop only ends at EOF or SIGINT.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use webpilot_core::{ToolRequest, ToolResponse};

use crate::app;

pub async fn run() -> anyhow::Result<()> {
    let app = app::bootstrap().await?;
    info!("Serving tool requests on stdin/stdout");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break; // EOF
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(&line) {
            Ok(request) => {
                app.registry
                    .dispatch(&request.name, app.ctx(), request.arguments)
                    .await
            }
            Err(e) => ToolResponse::fail(format!("malformed request: {}", e)),
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    app.shutdown().await;
    Ok(())
}
