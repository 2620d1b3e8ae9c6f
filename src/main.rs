//! Menushot - cached raster menus from a plugin catalog
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use menushot::cli::{commands, Cli, Commands};
use menushot::config::ConfigManager;
use menushot::error::MenushotResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> MenushotResult<()> {
    let cli = Cli::parse();

    // Worker output is a protocol channel; it needs neither config nor theme
    if let Commands::Worker = cli.command {
        init_logging(cli.verbose, false);
        return commands::worker().await;
    }

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = manager.load().await?;

    init_logging(cli.verbose, config.general.log_format == "json");
    menushot::ui::init_theme();

    match cli.command {
        Commands::Worker => unreachable!("worker handled above"),
        Commands::Render(args) => commands::render(args, &config).await,
        Commands::Cache(args) => commands::cache(args, &config).await,
        Commands::Clean => commands::clean(&config).await,
        Commands::Config(args) => commands::config(args, &config, &manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; always on stderr
fn init_logging(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("menushot=warn"),
        1 => EnvFilter::new("menushot=info"),
        _ => EnvFilter::new("menushot=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
