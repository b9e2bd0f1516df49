mod app;
mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "webpilot")]
#[command(about = "Browser automation tool server", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tool requests over stdin/stdout (one JSON object per line)
    Serve,

    /// Execute a single tool and print the response
    Run {
        /// Tool name, e.g. navigate_to or diagnostics__page_title
        tool_name: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// List registered tools
    Tools {
        /// Print full parameter schemas instead of one line per tool
        #[arg(long)]
        schemas: bool,
    },

    /// List loaded plugins and load failures
    Plugins,

    /// Run environment diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the serve loop owns stdout.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve => {
            commands::serve::run().await?;
        }
        Commands::Run { tool_name, args } => {
            commands::run_cmd::run(&tool_name, &args).await?;
        }
        Commands::Tools { schemas } => {
            commands::tools_cmd::list(schemas).await?;
        }
        Commands::Plugins => {
            commands::plugins_cmd::list().await?;
        }
        Commands::Doctor => {
            commands::doctor::run().await?;
        }
    }

    Ok(())
}
