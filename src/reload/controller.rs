//! The live-reload controller.

use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::Receiver;

use super::filter::is_relevant;
use super::gate::{ReloadGate, ReloadState};
use crate::core::AppContext;
use crate::document::Document;
use crate::loader::SourceLoader;
use crate::logger::{status_error, status_success};
use crate::publish::{BrowserOpener, Publisher};
use crate::watch::WatchEvent;

/// Owns the current Document and drives reload cycles.
///
/// Everything here runs on one thread; the gate exists so other threads can
/// observe the cycle and so a nested attempt is refused instead of run.
pub struct Controller<L, P> {
    ctx: Arc<AppContext>,
    loader: L,
    publisher: P,
    opener: Box<dyn BrowserOpener + Send>,
    gate: Arc<ReloadGate>,
    current: Document,
    browser_opened: bool,
}

impl<L: SourceLoader, P: Publisher> Controller<L, P> {
    pub fn new(
        ctx: Arc<AppContext>,
        loader: L,
        publisher: P,
        opener: Box<dyn BrowserOpener + Send>,
    ) -> Self {
        let current = Document::new(ctx.docid());
        Self {
            ctx,
            loader,
            publisher,
            opener,
            gate: ReloadGate::new(),
            current,
            browser_opened: false,
        }
    }

    /// Observation handle for the reload cycle.
    pub fn gate(&self) -> Arc<ReloadGate> {
        Arc::clone(&self.gate)
    }

    pub fn document(&self) -> &Document {
        &self.current
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Initial load. Opens the browser afterwards when asked to.
    pub fn start(&mut self, open_browser: bool) -> Option<ReloadState> {
        self.reload(open_browser)
    }

    /// Reload if the event concerns the source file.
    pub fn handle_event(&mut self, event: &WatchEvent) -> Option<ReloadState> {
        if !is_relevant(event, &self.ctx) {
            crate::debug!("reload"; "ignored {}", event);
            return None;
        }
        crate::debug!("reload"; "{}", event);
        self.reload(false)
    }

    /// Consume watch events until shutdown or until the watcher goes away.
    ///
    /// Events queued while a reload runs are drained afterwards and produce
    /// at most one follow-up reload.
    pub fn run(&mut self, events: &Receiver<WatchEvent>, shutdown: &Receiver<()>) {
        loop {
            crossbeam::select! {
                recv(shutdown) -> _ => break,
                recv(events) -> msg => {
                    let Ok(event) = msg else { break };
                    if self.handle_event(&event).is_none() {
                        continue;
                    }
                    while self.drain_pending(events) {
                        if shutdown.try_recv().is_ok() {
                            return;
                        }
                        self.reload(false);
                    }
                }
            }
        }
        crate::debug!("reload"; "run loop finished");
    }

    /// Empty the queue. True if any drained event was relevant.
    fn drain_pending(&self, events: &Receiver<WatchEvent>) -> bool {
        let mut relevant = false;
        for event in events.try_iter() {
            if is_relevant(&event, &self.ctx) {
                relevant = true;
            } else {
                crate::debug!("reload"; "ignored {}", event);
            }
        }
        relevant
    }

    /// One full reload cycle. `None` if a reload already holds the gate.
    fn reload(&mut self, open_browser: bool) -> Option<ReloadState> {
        let Some(guard) = self.gate.try_begin() else {
            crate::log!("reload"; "reload already in progress, dropped");
            return None;
        };
        let started = Instant::now();

        self.current.shell.begin_reload();
        self.publish();

        let fresh = Document::new(self.current.docid.clone());
        let outcome = match self.loader.load(&self.ctx.source_path, fresh) {
            Ok(mut document) => {
                document.shell = std::mem::take(&mut self.current.shell);
                self.current = document;
                status_success(&format!(
                    "reloaded {} in {:.0?}",
                    self.ctx.source_name(),
                    started.elapsed()
                ));
                ReloadState::Published
            }
            Err(err) => {
                self.current.shell.error_panel.show(err.message.clone());
                status_error(&format!("reload failed: {}", self.ctx.source_name()), &err.message);
                ReloadState::Failed
            }
        };
        guard.settle(outcome);

        self.current.shell.end_reload();
        self.publish();

        if open_browser && !self.browser_opened {
            self.browser_opened = true;
            let link = self.publisher.stable_link(&self.current);
            crate::log!("serve"; "opening {}", link);
            if let Err(e) = self.opener.open(&link) {
                crate::log!("serve"; "failed to open browser: {}", e);
            }
        }

        drop(guard);
        Some(outcome)
    }

    fn publish(&self) {
        self.publisher.push(Arc::new(self.current.clone()));
    }
}
