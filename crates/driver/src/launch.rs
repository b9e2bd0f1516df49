//! Browser process launch and debug-endpoint discovery.

use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::info;

use webpilot_core::{Error, Result};

use crate::OpenOptions;

/// Launch a browser process with remote debugging enabled.
/// Returns the child and the debug port it listens on.
pub async fn launch(opts: &OpenOptions, profile_dir: &Path) -> Result<(Child, u16)> {
    let binary = match &opts.binary {
        Some(path) => path.clone(),
        None => find_browser_binary(&opts.engine).ok_or_else(|| {
            Error::Driver(format!("{} not found; install it or set browser.binary", opts.engine))
        })?,
    };

    std::fs::create_dir_all(profile_dir)
        .map_err(|e| Error::Driver(format!("create profile dir: {}", e)))?;

    let debug_port = find_free_port().await?;
    let args = build_args(&opts.engine, debug_port, profile_dir, opts);

    info!(
        binary = %binary,
        port = debug_port,
        headless = opts.headless,
        "Launching browser"
    );

    let child = Command::new(&binary)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Driver(format!("launch {}: {}", binary, e)))?;

    Ok((child, debug_port))
}

fn build_args(engine: &str, debug_port: u16, profile_dir: &Path, opts: &OpenOptions) -> Vec<String> {
    if engine.eq_ignore_ascii_case("firefox") {
        let mut args = vec![
            "--remote-debugging-port".to_string(),
            debug_port.to_string(),
            "--profile".to_string(),
            profile_dir.display().to_string(),
            "--no-remote".to_string(),
        ];
        if opts.headless {
            args.push("--headless".to_string());
        }
        args.push("about:blank".to_string());
        args
    } else {
        // Chrome and Edge share flags.
        let mut args = vec![
            format!("--remote-debugging-port={}", debug_port),
            format!("--user-data-dir={}", profile_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-extensions".to_string(),
            "--disable-sync".to_string(),
            "--metrics-recording-only".to_string(),
            "--password-store=basic".to_string(),
        ];
        if opts.headless {
            args.push("--headless=new".to_string());
        }
        args.push(format!("--window-size={},{}", opts.width, opts.height));
        args.push("about:blank".to_string());
        args
    }
}

/// Find a browser binary for the given engine name.
pub fn find_browser_binary(engine: &str) -> Option<String> {
    let candidates: Vec<&str> = match engine.to_lowercase().as_str() {
        "edge" | "msedge" => {
            if cfg!(target_os = "macos") {
                vec!["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"]
            } else if cfg!(target_os = "linux") {
                vec!["microsoft-edge", "microsoft-edge-stable", "/usr/bin/microsoft-edge"]
            } else {
                vec![
                    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
                    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
                ]
            }
        }
        "firefox" | "ff" => {
            if cfg!(target_os = "macos") {
                vec!["/Applications/Firefox.app/Contents/MacOS/firefox"]
            } else if cfg!(target_os = "linux") {
                vec!["firefox", "/usr/bin/firefox"]
            } else {
                vec![
                    r"C:\Program Files\Mozilla Firefox\firefox.exe",
                    r"C:\Program Files (x86)\Mozilla Firefox\firefox.exe",
                ]
            }
        }
        _ => {
            if cfg!(target_os = "macos") {
                vec![
                    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                    "/Applications/Chromium.app/Contents/MacOS/Chromium",
                ]
            } else if cfg!(target_os = "linux") {
                vec![
                    "google-chrome",
                    "google-chrome-stable",
                    "chromium",
                    "chromium-browser",
                    "/usr/bin/google-chrome",
                    "/usr/bin/chromium",
                ]
            } else {
                vec![
                    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
                ]
            }
        }
    };

    for candidate in candidates {
        if Path::new(candidate).exists() {
            return Some(candidate.to_string());
        }
        if !candidate.contains('/') && !candidate.contains('\\') && which::which(candidate).is_ok() {
            return Some(candidate.to_string());
        }
    }
    None
}

/// List the engines with a discoverable binary on this machine.
pub fn available_browsers() -> Vec<(String, String)> {
    ["chrome", "edge", "firefox"]
        .iter()
        .filter_map(|engine| {
            find_browser_binary(engine).map(|path| (engine.to_string(), path))
        })
        .collect()
}

async fn find_free_port() -> Result<u16> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| Error::Driver(format!("bind for free port: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| Error::Driver(format!("local addr: {}", e)))?
        .port();
    drop(listener);
    Ok(port)
}

/// Poll the debug endpoint until the browser answers, then resolve the
/// first page target's WebSocket URL.
pub async fn wait_for_page_target(port: u16, timeout: Duration) -> Result<String> {
    let start = std::time::Instant::now();
    let version_url = format!("http://127.0.0.1:{}/json/version", port);

    loop {
        if start.elapsed() > timeout {
            return Err(Error::Timeout(format!(
                "debug endpoint on port {} after {}s",
                port,
                timeout.as_secs()
            )));
        }
        if let Ok(resp) = reqwest::get(&version_url).await {
            if resp.json::<Value>().await.is_ok() {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    // The page target may lag behind the browser endpoint.
    let list_url = format!("http://127.0.0.1:{}/json/list", port);
    for attempt in 0..10 {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        let targets: Vec<Value> = match reqwest::get(&list_url).await {
            Ok(resp) => match resp.json().await {
                Ok(t) => t,
                Err(_) => continue,
            },
            Err(_) => continue,
        };
        for target in &targets {
            if target.get("type").and_then(|v| v.as_str()) == Some("page") {
                if let Some(ws) = target.get("webSocketDebuggerUrl").and_then(|v| v.as_str()) {
                    return Ok(ws.to_string());
                }
            }
        }
    }

    Err(Error::Driver("no page target found after retries".to_string()))
}
