//! Command-line interface definitions.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand};

use crate::core::Mode;

/// Environment variable carrying the version string.
pub const VERSION_ENV: &str = "LIVEDOC_VERSION";

/// Live-reloading document server
#[derive(Parser, Debug, Clone)]
#[command(
    name = "livedoc",
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: livedoc.toml)
    #[arg(short = 'C', long, default_value = "livedoc.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print version
    #[arg(short = 'v', long)]
    pub version: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the application and reload it whenever its source changes
    #[command(visible_alias = "d")]
    Develop {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Serve the application without reloading
    #[command(visible_alias = "r")]
    Run {
        #[command(flatten)]
        args: ServeArgs,
    },
}

/// Shared arguments for Develop and Run.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// Do not open a browser after the initial load
    #[arg(long)]
    pub no_open: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl Cli {
    /// Mode and arguments of the selected subcommand.
    pub fn serve(&self) -> Option<(Mode, &ServeArgs)> {
        match &self.command {
            Some(Commands::Develop { args }) => Some((Mode::Develop, args)),
            Some(Commands::Run { args }) => Some((Mode::Run, args)),
            None => None,
        }
    }
}

/// The version string, or `unknown version` when none is set.
pub fn version_string() -> String {
    version_from(std::env::var(VERSION_ENV).ok())
}

fn version_from(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown version".to_string())
}
