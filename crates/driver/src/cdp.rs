//! Chrome DevTools Protocol client over WebSocket.
//!
//! Sends commands to a page target and matches responses by request id.
//! Events are currently ignored; the driver boundary is strictly
//! request/response.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

use webpilot_core::{Error, Result};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CdpClient {
    ws_tx: mpsc::Sender<String>,
    /// Pending command responses, keyed by request id.
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>,
    next_id: AtomicU64,
    reader_handle: tokio::task::JoinHandle<()>,
    writer_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a page target's WebSocket debugger URL.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::connect_async;
        use tokio_tungstenite::tungstenite::Message;

        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| Error::Driver(format!("connect to {}: {}", ws_url, e)))?;

        let (mut ws_sink, mut ws_read) = ws_stream.split();
        let (ws_tx, mut ws_rx) = mpsc::channel::<String>(256);

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let pending_reader = pending.clone();

        // Writer task owns the sink and forwards outgoing commands.
        let writer_handle = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                if let Err(e) = ws_sink.send(Message::Text(msg)).await {
                    error!("CDP write error: {}", e);
                    break;
                }
            }
        });

        // Reader task routes responses back to the waiting caller.
        let reader_handle = tokio::spawn(async move {
            while let Some(msg) = ws_read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Ok(val) = serde_json::from_str::<Value>(&text) {
                            if let Some(id) = val.get("id").and_then(|v| v.as_u64()) {
                                let mut pending = pending_reader.lock().await;
                                if let Some(tx) = pending.remove(&id) {
                                    let _ = tx.send(val);
                                }
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("CDP socket closed by browser");
                        break;
                    }
                    Err(e) => {
                        warn!("CDP read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        Ok(Self {
            ws_tx,
            pending,
            next_id: AtomicU64::new(1),
            reader_handle,
            writer_handle,
        })
    }

    /// Send a CDP command and wait for its result.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let msg = json!({ "id": id, "method": method, "params": params });

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        self.ws_tx
            .send(msg.to_string())
            .await
            .map_err(|e| Error::Driver(format!("send {}: {}", method, e)))?;

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(response)) => {
                if let Some(err) = response.get("error") {
                    Err(Error::Driver(format!("{}: {}", method, err)))
                } else {
                    Ok(response.get("result").cloned().unwrap_or(Value::Null))
                }
            }
            Ok(Err(_)) => Err(Error::Driver("CDP response channel closed".to_string())),
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                Err(Error::Timeout(format!(
                    "CDP command '{}' after {}s",
                    method,
                    COMMAND_TIMEOUT.as_secs()
                )))
            }
        }
    }

    pub async fn enable_domain(&self, domain: &str) -> Result<()> {
        self.send_command(&format!("{}.enable", domain), json!({}))
            .await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<Value> {
        self.send_command("Page.navigate", json!({ "url": url })).await
    }

    /// Evaluate a JavaScript expression, returning the value by copy.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .unwrap_or("script threw");
            return Err(Error::Driver(format!("evaluate: {}", text)));
        }
        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Insert text into the focused element via the Input domain.
    pub async fn insert_text(&self, text: &str) -> Result<()> {
        self.send_command("Input.insertText", json!({ "text": text }))
            .await?;
        Ok(())
    }

    /// Screenshot of the page, base64 PNG.
    pub async fn screenshot(&self, full_page: bool) -> Result<String> {
        let mut params = json!({ "format": "png" });
        if full_page {
            params["captureBeyondViewport"] = json!(true);
        }
        let result = self.send_command("Page.captureScreenshot", params).await?;
        result
            .get("data")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Driver("no screenshot data returned".to_string()))
    }

    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<()> {
        self.send_command(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": 1.0,
                "mobile": false,
            }),
        )
        .await?;
        Ok(())
    }

    /// Ask the browser to shut down cleanly.
    pub async fn close_browser(&self) -> Result<()> {
        self.send_command("Browser.close", json!({})).await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader_handle.abort();
        self.writer_handle.abort();
    }
}
