use webpilot_core::{Config, Paths};
use webpilot_driver::launch::available_browsers;

/// Environment diagnostics: config, directories, browser binaries.
pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!();
    println!("webpilot doctor");
    println!("===============");
    println!();

    println!("Configuration");
    if paths.config_file().exists() {
        println!("  [ok]   config file: {}", paths.config_file().display());
    } else {
        println!(
            "  [warn] no config file at {} (defaults in effect)",
            paths.config_file().display()
        );
    }
    let config = Config::load(&paths)?;
    println!(
        "  engine: {}, headless: {}, step timeout: {}ms",
        config.browser.engine, config.browser.headless, config.engine.step_timeout_ms
    );
    println!();

    println!("Directories");
    for (name, dir) in [
        ("profiles", paths.profiles_dir()),
        ("plugins", paths.plugins_dir()),
        ("artifacts", paths.artifacts_dir()),
    ] {
        let marker = if dir.exists() { "ok  " } else { "warn" };
        println!("  [{}] {}: {}", marker, name, dir.display());
    }
    println!();

    println!("Browsers");
    let browsers = available_browsers();
    if browsers.is_empty() {
        println!("  [err]  no supported browser found (chrome, edge or firefox)");
    }
    for (engine, path) in &browsers {
        println!("  [ok]   {}: {}", engine, path);
    }
    let configured_found = browsers.iter().any(|(e, _)| e == &config.browser.engine);
    if !configured_found && !browsers.is_empty() {
        println!(
            "  [warn] configured engine '{}' not found; sessions will fail to open",
            config.browser.engine
        );
    }
    println!();

    Ok(())
}
