use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use parking_lot::Mutex;
use tempfile::TempDir;

use super::{Controller, ReloadState};
use crate::cli::ServeArgs;
use crate::config::AppConfig;
use crate::core::{AppContext, Mode, test_context};
use crate::document::Document;
use crate::loader::{LoadError, LuaLoader, SourceLoader};
use crate::publish::{BrowserOpener, Publisher};
use crate::watch::{ChangeDetector, WatchEvent, WatchKind};

// =============================================================================
// Test doubles
// =============================================================================

#[derive(Clone, Default)]
struct RecordingPublisher {
    pushes: Arc<Mutex<Vec<Arc<Document>>>>,
}

impl RecordingPublisher {
    fn pushes(&self) -> Vec<Arc<Document>> {
        self.pushes.lock().clone()
    }
}

impl Publisher for RecordingPublisher {
    fn push(&self, document: Arc<Document>) {
        self.pushes.lock().push(document);
    }

    fn stable_link(&self, document: &Document) -> String {
        format!("http://localhost:5006/{}/", document.docid)
    }

    fn stop(&self) {}
}

#[derive(Clone, Default)]
struct RecordingOpener {
    opened: Arc<Mutex<Vec<String>>>,
}

impl BrowserOpener for RecordingOpener {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.lock().push(url.to_string());
        Ok(())
    }
}

/// Sleeps inside every load and records when each one ran.
#[derive(Clone)]
struct SlowLoader {
    delay: Duration,
    spans: Arc<Mutex<Vec<(Instant, Instant)>>>,
}

impl SlowLoader {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            spans: Arc::default(),
        }
    }

    fn loads(&self) -> usize {
        self.spans.lock().len()
    }
}

impl SourceLoader for SlowLoader {
    fn load(&self, _path: &Path, mut into: Document) -> Result<Document, LoadError> {
        let start = Instant::now();
        thread::sleep(self.delay);
        into.title = Some("slow".into());
        self.spans.lock().push((start, Instant::now()));
        Ok(into)
    }
}

struct Fixture {
    temp: TempDir,
    ctx: Arc<AppContext>,
    publisher: RecordingPublisher,
    opener: RecordingOpener,
}

impl Fixture {
    fn new(mode: Mode, source: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let ctx = test_context(temp.path(), mode);
        fs::write(&ctx.source_path, source).unwrap();
        Self {
            temp,
            ctx: Arc::new(ctx),
            publisher: RecordingPublisher::default(),
            opener: RecordingOpener::default(),
        }
    }

    fn controller(&self) -> Controller<LuaLoader, RecordingPublisher> {
        Controller::new(
            Arc::clone(&self.ctx),
            LuaLoader::new(Arc::clone(&self.ctx)),
            self.publisher.clone(),
            Box::new(self.opener.clone()),
        )
    }

    fn write_source(&self, source: &str) {
        fs::write(&self.ctx.source_path, source).unwrap();
    }

    fn modified(&self) -> WatchEvent {
        WatchEvent::new(self.ctx.source_path.clone(), WatchKind::Modified)
    }
}

const GOOD: &str = "doc.set_title('good')\ndoc.add_root({ type = 'Slider' })\n";
const BROKEN: &str = "doc.set_title('broken')\nlocal x = nil\nx.field = 1\n";

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

// =============================================================================
// Reload cycle
// =============================================================================

#[test]
fn test_initial_load_publishes_document() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();

    assert_eq!(controller.start(false), Some(ReloadState::Published));

    let doc = controller.document();
    assert_eq!(doc.title.as_deref(), Some("good"));
    assert_eq!(doc.roots.len(), 1);
    assert!(!doc.shell.error_panel.visible);
    assert!(!doc.shell.reloading.visible);
    assert_eq!(controller.gate().state(), ReloadState::Idle);
}

#[test]
fn test_each_reload_pushes_twice() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();
    controller.start(false);

    let pushes = fx.publisher.pushes();
    assert_eq!(pushes.len(), 2);
    assert!(pushes[0].shell.reloading.visible);
    assert!(!pushes[1].shell.reloading.visible);
    assert_eq!(pushes[1].title.as_deref(), Some("good"));

    controller.handle_event(&fx.modified());
    let pushes = fx.publisher.pushes();
    assert_eq!(pushes.len(), 4);
    assert!(pushes[2].shell.reloading.visible);
    assert!(!pushes[3].shell.reloading.visible);
}

#[test]
fn test_failed_reload_keeps_content_and_shows_error() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();
    controller.start(false);
    let before = controller.document().clone();

    fx.write_source(BROKEN);
    assert_eq!(
        controller.handle_event(&fx.modified()),
        Some(ReloadState::Failed)
    );

    let doc = controller.document();
    assert!(doc.same_content(&before));
    assert!(doc.shell.error_panel.visible);
    assert!(doc.shell.error_panel.message.contains("doc.lua:3"));
    assert!(!doc.shell.reloading.visible);

    let last = fx.publisher.pushes().pop().unwrap();
    assert!(last.shell.error_panel.visible);
    assert!(!last.shell.reloading.visible);
}

#[test]
fn test_fix_clears_error() {
    let fx = Fixture::new(Mode::Develop, BROKEN);
    let mut controller = fx.controller();
    assert_eq!(controller.start(false), Some(ReloadState::Failed));
    assert!(controller.document().shell.error_panel.visible);
    assert!(controller.document().roots.is_empty());

    fx.write_source(GOOD);
    assert_eq!(
        controller.handle_event(&fx.modified()),
        Some(ReloadState::Published)
    );

    let doc = controller.document();
    assert!(!doc.shell.error_panel.visible);
    assert!(doc.shell.error_panel.message.is_empty());
    assert_eq!(doc.title.as_deref(), Some("good"));
}

#[test]
fn test_reload_start_hides_previous_error() {
    let fx = Fixture::new(Mode::Develop, BROKEN);
    let mut controller = fx.controller();
    controller.start(false);

    controller.handle_event(&fx.modified());
    let pushes = fx.publisher.pushes();
    // Intermediate push of the second cycle.
    assert!(pushes[2].shell.reloading.visible);
    assert!(!pushes[2].shell.error_panel.visible);
    assert!(pushes[3].shell.error_panel.visible);
}

#[test]
fn test_error_panel_always_consistent() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();
    controller.start(false);
    for source in [BROKEN, GOOD, BROKEN, BROKEN, GOOD] {
        fx.write_source(source);
        controller.handle_event(&fx.modified());
    }
    for doc in fx.publisher.pushes() {
        assert!(doc.shell.error_panel.is_consistent());
    }
}

#[test]
fn test_docid_stable_across_reloads() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();
    controller.start(false);
    fx.write_source(BROKEN);
    controller.handle_event(&fx.modified());
    fx.write_source(GOOD);
    controller.handle_event(&fx.modified());

    let ids: Vec<_> = fx.publisher.pushes().iter().map(|d| d.docid.clone()).collect();
    assert!(ids.iter().all(|id| id == "demo"));
}

// =============================================================================
// Relevance
// =============================================================================

#[test]
fn test_irrelevant_events_have_no_effect() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();
    controller.start(false);
    let pushes = fx.publisher.pushes().len();
    let before = controller.document().clone();

    let other = fx.temp.path().join("notes.txt");
    let events = [
        WatchEvent::new(other, WatchKind::Modified),
        WatchEvent::new(fx.ctx.source_path.clone(), WatchKind::Created),
        WatchEvent::new(fx.ctx.source_path.clone(), WatchKind::Deleted),
        WatchEvent::new(fx.ctx.source_path.clone(), WatchKind::Moved),
    ];
    for event in &events {
        assert_eq!(controller.handle_event(event), None);
    }

    assert_eq!(fx.publisher.pushes().len(), pushes);
    assert_eq!(controller.document(), &before);
}

#[test]
fn test_run_mode_never_reloads_on_change() {
    let fx = Fixture::new(Mode::Run, GOOD);
    let mut controller = fx.controller();
    assert_eq!(controller.start(false), Some(ReloadState::Published));

    fx.write_source(BROKEN);
    assert_eq!(controller.handle_event(&fx.modified()), None);
    assert_eq!(controller.document().title.as_deref(), Some("good"));
    assert_eq!(fx.publisher.pushes().len(), 2);
}

// =============================================================================
// Browser
// =============================================================================

#[test]
fn test_browser_opened_once_on_initial_load() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();
    controller.start(true);
    controller.handle_event(&fx.modified());
    controller.handle_event(&fx.modified());

    let opened = fx.opener.opened.lock().clone();
    assert_eq!(opened, vec!["http://localhost:5006/demo/".to_string()]);
}

#[test]
fn test_browser_not_opened_when_not_requested() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();
    controller.start(false);
    controller.handle_event(&fx.modified());
    assert!(fx.opener.opened.lock().is_empty());
}

#[test]
fn test_browser_open_failure_is_not_fatal() {
    struct FailingOpener;
    impl BrowserOpener for FailingOpener {
        fn open(&self, _url: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no browser"))
        }
    }

    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = Controller::new(
        Arc::clone(&fx.ctx),
        LuaLoader::new(Arc::clone(&fx.ctx)),
        fx.publisher.clone(),
        Box::new(FailingOpener),
    );
    assert_eq!(controller.start(true), Some(ReloadState::Published));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_indicator_visible_only_while_loading() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let loader = SlowLoader::new(Duration::from_millis(300));
    let publisher = fx.publisher.clone();
    let mut controller = Controller::new(
        Arc::clone(&fx.ctx),
        loader.clone(),
        publisher.clone(),
        Box::new(fx.opener.clone()),
    );
    let gate = controller.gate();
    assert!(!gate.is_reloading());

    let worker = thread::spawn(move || controller.start(false));

    assert!(wait_until(Duration::from_secs(2), || gate.is_reloading()));
    assert_eq!(gate.state(), ReloadState::Reloading);
    let mid = publisher.pushes();
    assert_eq!(mid.len(), 1);
    assert!(mid[0].shell.reloading.visible);

    assert_eq!(worker.join().unwrap(), Some(ReloadState::Published));
    assert!(!gate.is_reloading());
    assert_eq!(gate.state(), ReloadState::Idle);
    assert!(!publisher.pushes()[1].shell.reloading.visible);
}

#[test]
fn test_queued_events_coalesce_into_one_followup() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let loader = SlowLoader::new(Duration::from_millis(100));
    let mut controller = Controller::new(
        Arc::clone(&fx.ctx),
        loader.clone(),
        fx.publisher.clone(),
        Box::new(fx.opener.clone()),
    );
    let (event_tx, event_rx) = channel::unbounded();
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);

    for _ in 0..3 {
        event_tx.send(fx.modified()).unwrap();
    }
    let worker = thread::spawn(move || controller.run(&event_rx, &shutdown_rx));

    assert!(wait_until(Duration::from_secs(3), || loader.loads() >= 2));
    // Give a wrongly scheduled third reload the chance to start.
    thread::sleep(Duration::from_millis(250));
    shutdown_tx.send(()).unwrap();
    worker.join().unwrap();

    assert_eq!(loader.loads(), 2);
}

#[test]
fn test_reloads_never_overlap() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let loader = SlowLoader::new(Duration::from_millis(50));
    let mut controller = Controller::new(
        Arc::clone(&fx.ctx),
        loader.clone(),
        fx.publisher.clone(),
        Box::new(fx.opener.clone()),
    );
    let gate = controller.gate();
    let (event_tx, event_rx) = channel::unbounded();
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);

    let worker = thread::spawn(move || controller.run(&event_rx, &shutdown_rx));
    for _ in 0..10 {
        event_tx.send(fx.modified()).unwrap();
        thread::sleep(Duration::from_millis(20));
    }
    assert!(wait_until(Duration::from_secs(3), || !gate.is_reloading()
        && event_tx.is_empty()));
    thread::sleep(Duration::from_millis(100));
    shutdown_tx.send(()).unwrap();
    worker.join().unwrap();

    let spans = loader.spans.lock().clone();
    assert!(spans.len() >= 2);
    assert!(spans.len() <= 10);
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "reloads overlapped");
    }
    assert_eq!(gate.completed() as usize, spans.len());
}

#[test]
fn test_run_returns_when_events_disconnect() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();
    let (event_tx, event_rx) = channel::unbounded::<WatchEvent>();
    let (_shutdown_tx, shutdown_rx) = channel::bounded(1);

    drop(event_tx);
    controller.run(&event_rx, &shutdown_rx);
    assert!(fx.publisher.pushes().is_empty());
}

#[test]
fn test_run_returns_on_shutdown() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let mut controller = fx.controller();
    let (_event_tx, event_rx) = channel::unbounded::<WatchEvent>();
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);

    shutdown_tx.send(()).unwrap();
    controller.run(&event_rx, &shutdown_rx);
    assert_eq!(controller.gate().completed(), 0);
}

#[test]
fn test_hung_reload_interrupted_by_shutdown() {
    let fx = Fixture::new(Mode::Develop, GOOD);
    let interrupt = Arc::new(AtomicBool::new(false));
    let mut controller = Controller::new(
        Arc::clone(&fx.ctx),
        LuaLoader::new(Arc::clone(&fx.ctx)).with_interrupt(Arc::clone(&interrupt)),
        fx.publisher.clone(),
        Box::new(fx.opener.clone()),
    );
    controller.start(false);
    let gate = controller.gate();

    fx.write_source("doc.set_title('spin')\nwhile true do end\n");
    let (event_tx, event_rx) = channel::unbounded();
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    event_tx.send(fx.modified()).unwrap();
    let worker = thread::spawn(move || controller.run(&event_rx, &shutdown_rx));

    assert!(wait_until(Duration::from_secs(2), || gate.is_reloading()));
    // Repeated interrupts while the loop spins must not block the sender.
    assert!(shutdown_tx.try_send(()).is_ok());
    assert!(shutdown_tx.try_send(()).is_err());
    interrupt.store(true, Ordering::Relaxed);

    assert!(wait_until(Duration::from_secs(5), || worker.is_finished()));
    worker.join().unwrap();

    let last = fx.publisher.pushes().pop().unwrap();
    assert_eq!(last.title.as_deref(), Some("good"));
    assert!(last.shell.error_panel.visible);
    assert!(last.shell.error_panel.message.contains("interrupted"));
    assert!(!last.shell.reloading.visible);
}

// =============================================================================
// Watcher wiring
// =============================================================================

#[test]
fn test_real_save_reloads_through_watcher() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("doc.lua"), GOOD).unwrap();

    let config = AppConfig::load_in(
        temp.path(),
        Path::new("livedoc.toml"),
        &ServeArgs::default(),
    )
    .unwrap();
    let ctx = Arc::new(config.resolve_context(Mode::Develop).unwrap());
    let (mut detector, events) = ChangeDetector::watch(&ctx.directory, false).unwrap();

    let publisher = RecordingPublisher::default();
    let mut controller = Controller::new(
        Arc::clone(&ctx),
        LuaLoader::new(Arc::clone(&ctx)),
        publisher.clone(),
        Box::new(RecordingOpener::default()),
    );
    assert_eq!(controller.start(false), Some(ReloadState::Published));

    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    let worker = thread::spawn(move || controller.run(&events, &shutdown_rx));

    // Saved through the unnormalized temp path, as an editor would.
    fs::write(temp.path().join("doc.lua"), BROKEN).unwrap();
    let shown = wait_until(Duration::from_secs(5), || {
        publisher
            .pushes()
            .last()
            .is_some_and(|doc| doc.shell.error_panel.visible)
    });

    shutdown_tx.send(()).unwrap();
    worker.join().unwrap();
    detector.stop();
    detector.join();

    assert!(shown, "no reload after writing {}", ctx.source_path.display());
    let last = publisher.pushes().pop().unwrap();
    assert_eq!(last.title.as_deref(), Some("good"));
    assert!(last.shell.error_panel.message.contains("doc.lua:3"));
}
