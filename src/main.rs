//! livedoc - serve a Lua-built document and reload it on every save.

#![allow(dead_code)]

mod cli;
mod config;
mod core;
mod document;
mod embed;
mod loader;
mod logger;
mod publish;
mod reload;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, CommandFactory, Parser};
use cli::{Cli, version_string};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    if cli.version {
        println!("{}", version_string());
        return Ok(());
    }

    match cli.serve() {
        Some((mode, args)) => cli::serve::serve(&cli.config, mode, args),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
