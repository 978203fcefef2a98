//! Process-wide shutdown state.
//!
//! - `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)
//! - `SHUTDOWN_TX`: wakes the controller's run loop once serving has started
//!
//! A running load polls `SHUTDOWN` through [`shutdown_flag`], so a script
//! stuck in a loop cannot keep the run loop from seeing the signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, OnceLock};

use crossbeam::channel::Sender;

/// Exit status for a second Ctrl+C (128 + SIGINT).
const FORCED_EXIT: i32 = 130;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: LazyLock<Arc<AtomicBool>> = LazyLock::new(Arc::default);

/// Shutdown signal sender for the controller run loop
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// The handler behavior depends on whether serving has started:
/// - Before `register_shutdown()`: exit immediately, nothing to tear down
/// - After `register_shutdown()`: graceful shutdown through the run loop
/// - A second Ctrl+C always exits immediately
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            std::process::exit(FORCED_EXIT);
        }

        match SHUTDOWN_TX.get() {
            Some(tx) => {
                crate::log!("serve"; "shutting down...");
                signal(tx);
            }
            None => std::process::exit(0),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Wake the run loop without ever blocking the handler thread.
fn signal(tx: &Sender<()>) {
    // Full means a signal is already pending.
    let _ = tx.try_send(());
}

/// Register the channel the Ctrl+C handler signals.
///
/// Call this once the publisher and watcher are running.
pub fn register_shutdown(shutdown_tx: Sender<()>) {
    let _ = SHUTDOWN_TX.set(shutdown_tx);
}

/// Shared handle to the shutdown flag, for loads that poll it.
pub fn shutdown_flag() -> Arc<AtomicBool> {
    Arc::clone(&SHUTDOWN)
}
