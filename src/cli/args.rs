//! CLI argument definitions using clap derive

use crate::catalog::RenderMode;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Menushot - cached raster menus from a plugin catalog
///
/// Balances a catalog into columns, typesets it with Typst and delivers
/// WebP pages, reusing the last render while nothing has changed.
#[derive(Parser, Debug)]
#[command(name = "menushot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "MENUSHOT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a catalog into menu images
    Render(RenderArgs),

    /// Compile one render task read from stdin (internal)
    #[command(hide = true)]
    Worker,

    /// Inspect or clear the static render cache
    Cache(CacheArgs),

    /// Delete leftover temporary render files
    Clean,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the render command
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Menu to render
    #[arg(short, long, default_value = "command", value_parser = parse_mode)]
    pub mode: RenderMode,

    /// Catalog file (JSON array of containers)
    #[arg(long)]
    pub catalog: PathBuf,

    /// Only show entries matching this text (renders a one-off menu)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Copy delivered images into this directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the menu title
    #[arg(long)]
    pub title: Option<String>,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show the stored render for each menu
    Status,

    /// Remove stored renders
    Clear {
        /// Only clear this menu
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<RenderMode>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

fn parse_mode(s: &str) -> Result<RenderMode, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_render() {
        let cli = Cli::parse_from([
            "menushot", "render", "--mode", "event", "--catalog", "plugins.json", "-q", "git",
        ]);
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.mode, RenderMode::Event);
                assert_eq!(args.catalog, PathBuf::from("plugins.json"));
                assert_eq!(args.query.as_deref(), Some("git"));
                assert!(args.output.is_none());
            }
            _ => panic!("expected Render command"),
        }
    }

    #[test]
    fn render_mode_defaults_to_command() {
        let cli = Cli::parse_from(["menushot", "render", "--catalog", "c.json"]);
        match cli.command {
            Commands::Render(args) => assert_eq!(args.mode, RenderMode::Command),
            _ => panic!("expected Render command"),
        }
    }

    #[test]
    fn unknown_mode_rejected() {
        let result = Cli::try_parse_from(["menushot", "render", "--mode", "nope", "--catalog", "c"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parses_worker() {
        let cli = Cli::parse_from(["menushot", "worker"]);
        assert!(matches!(cli.command, Commands::Worker));
    }

    #[test]
    fn cli_parses_cache_clear() {
        let cli = Cli::parse_from(["menushot", "cache", "clear", "--mode", "filter", "-y"]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Clear { mode, yes },
            }) => {
                assert_eq!(mode, Some(RenderMode::Filter));
                assert!(yes);
            }
            _ => panic!("expected cache clear"),
        }
    }

    #[test]
    fn cli_parses_config_init_force() {
        let cli = Cli::parse_from(["menushot", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Init { force }),
            }) => assert!(force),
            _ => panic!("expected config init"),
        }
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["menushot", "clean"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["menushot", "-v", "clean"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["menushot", "-vv", "clean"]);
        assert_eq!(cli.verbose, 2);
    }
}
