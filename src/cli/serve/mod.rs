//! `develop` and `run`: serve the application, reloading it in develop mode.
//!
//! Startup order:
//!
//! ```text
//! config → AppContext → watcher → publisher → initial load → run loop
//! ```
//!
//! The watcher starts before the initial load so that edits made while it
//! runs are queued instead of lost.

mod lifecycle;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel;

use crate::cli::ServeArgs;
use crate::config::{AppConfig, ConfigError};
use crate::core::{Mode, register_shutdown};
use crate::loader::LuaLoader;
use crate::log;
use crate::publish::{HttpPublisher, SystemBrowser};
use crate::reload::Controller;
use crate::watch::ChangeDetector;

/// Serve until Ctrl+C.
pub fn serve(config_file: &Path, mode: Mode, args: &ServeArgs) -> Result<()> {
    crate::logger::set_verbose(args.verbose);

    let config = AppConfig::load(config_file, args)?;
    let ctx = match config.resolve_context(mode) {
        Ok(ctx) => Arc::new(ctx),
        Err(e @ ConfigError::MissingSource { .. }) => lifecycle::die(&e.to_string()),
        Err(e) => return Err(e.into()),
    };

    log!(
        "serve";
        "Starting {} in {} mode on port {}",
        ctx.name,
        mode.label(),
        ctx.port
    );

    let (detector, events) = ChangeDetector::watch(&ctx.directory, false)
        .with_context(|| format!("failed to watch {}", ctx.directory.display()))?;
    let publisher =
        HttpPublisher::bind(&config.serve, &ctx.docid()).context("failed to start server")?;

    let mut controller = Controller::new(
        Arc::clone(&ctx),
        LuaLoader::new(Arc::clone(&ctx)),
        publisher,
        Box::new(SystemBrowser),
    );
    controller.start(config.serve.open);

    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    register_shutdown(shutdown_tx);
    if mode.is_develop() {
        log!("watch"; "watching {} for changes", ctx.source_name());
    }

    controller.run(&events, &shutdown_rx);
    lifecycle::shutdown(controller.publisher(), detector);
    Ok(())
}
