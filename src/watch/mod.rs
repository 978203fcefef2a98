//! Change Detector
//!
//! Watches a directory tree and emits [`WatchEvent`]s on a channel from a
//! dedicated thread. It never interprets paths; relevance is decided by the
//! controller.
//!
//! ```text
//! notify callback → raw channel → watch thread (translate) → WatchEvent channel
//! ```
//!
//! The watcher is created before the initial load so that events raised
//! while the first reload runs are buffered, not lost.

mod event;

pub use event::{WatchEvent, WatchKind, classify, translate};

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

/// Fatal watcher setup errors.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot watch `{0}`: directory is not accessible")]
    Inaccessible(PathBuf),

    #[error("failed to create filesystem watcher")]
    Notify(#[from] notify::Error),

    #[error("failed to spawn watch thread")]
    Spawn(#[source] std::io::Error),
}

/// Handle to a running directory watch.
///
/// The event sequence ends after [`stop`](Self::stop); a detector cannot be
/// restarted.
pub struct ChangeDetector {
    watcher: Option<RecommendedWatcher>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ChangeDetector {
    /// Start watching `root` and return the handle plus the event stream.
    pub fn watch(root: &Path, recursive: bool) -> Result<(Self, Receiver<WatchEvent>), WatchError> {
        if !root.is_dir() {
            return Err(WatchError::Inaccessible(root.to_path_buf()));
        }

        let (raw_tx, raw_rx) = channel::unbounded::<notify::Result<notify::Event>>();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(root, mode)?;

        let (event_tx, event_rx) = channel::unbounded();
        let (stop_tx, stop_rx) = channel::bounded(1);

        let handle = thread::Builder::new()
            .name("livedoc-watch".into())
            .spawn(move || watch_loop(&raw_rx, &event_tx, &stop_rx))
            .map_err(WatchError::Spawn)?;

        crate::debug!("watch"; "watching {}", root.display());

        Ok((
            Self {
                watcher: Some(watcher),
                stop_tx: Some(stop_tx),
                handle: Some(handle),
            },
            event_rx,
        ))
    }

    /// End the event sequence and release the OS watch handles.
    pub fn stop(&mut self) {
        // Dropping the watcher closes the raw channel as well.
        self.watcher.take();
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Block until the watch thread has exited.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            crate::log!("watch"; "watch thread panicked");
        }
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ChangeDetector {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

/// Forward translated events until stopped or the receiver is gone.
fn watch_loop(
    raw_rx: &Receiver<notify::Result<notify::Event>>,
    event_tx: &Sender<WatchEvent>,
    stop_rx: &Receiver<()>,
) {
    loop {
        crossbeam::select! {
            recv(stop_rx) -> _ => break,
            recv(raw_rx) -> msg => match msg {
                Ok(Ok(event)) => {
                    for event in translate(&event) {
                        crate::debug!("watch"; "{}", event);
                        if event_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                // Keep watching: the directory may be mid-rewrite.
                Ok(Err(e)) => crate::log!("watch"; "notify error: {}", e),
                Err(_) => break,
            },
        }
    }
    crate::debug!("watch"; "stopped");
}
