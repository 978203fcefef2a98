//! HTTP publisher.
//!
//! Routes:
//!
//! | Request                     | Response                          |
//! |-----------------------------|-----------------------------------|
//! | `GET /`                     | 302 to `/<docid>/`                |
//! | `GET /<docid>/`             | client page                       |
//! | `GET /<docid>/document.json`| current snapshot                  |
//! | anything else               | 404                               |
//! | anything after `stop()`     | 503                               |

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::Result;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use tiny_http::{Method, Request, Server};

use super::message::DocumentMessage;
use super::ws::Broadcaster;
use super::{PublishError, Publisher, response};
use crate::config::ServeConfig;
use crate::document::Document;
use crate::embed::client::{CLIENT_HTML, ClientVars};

/// Worker threads answering HTTP requests
const REQUEST_THREADS: usize = 4;

/// Path segment characters left unescaped in links.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// What a request path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Route {
    Root,
    Page,
    Snapshot,
    NotFound,
}

/// Resolve a request URL against the document id.
pub(super) fn route(method: &Method, url: &str, docid: &str) -> Route {
    if !matches!(method, Method::Get | Method::Head) {
        return Route::NotFound;
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = percent_decode_str(path).decode_utf8_lossy();
    if path == "/" {
        return Route::Root;
    }

    match path.strip_prefix('/').and_then(|p| p.strip_prefix(docid)) {
        Some("/") => Route::Page,
        Some("/document.json") => Route::Snapshot,
        _ => Route::NotFound,
    }
}

/// `/<docid>/` with the id percent-encoded.
pub(super) fn document_path(docid: &str) -> String {
    format!("/{}/", utf8_percent_encode(docid, SEGMENT))
}

/// Host part of a link for the given bind address.
pub(super) fn link_host(interface: IpAddr) -> String {
    match interface {
        ip if ip.is_unspecified() || ip.is_loopback() => "localhost".to_string(),
        IpAddr::V6(ip) => format!("[{ip}]"),
        IpAddr::V4(ip) => ip.to_string(),
    }
}

/// State shared with request workers.
struct Shared {
    docid: String,
    snapshot: ArcSwap<Document>,
    revision: AtomicU64,
    stopped: AtomicBool,
    ws_port: u16,
}

/// Serves the client page and snapshot over HTTP, pushes over WebSocket.
pub struct HttpPublisher {
    shared: Arc<Shared>,
    /// Taken on stop so the listening socket closes.
    server: Mutex<Option<Arc<Server>>>,
    ws: Broadcaster,
    addr: SocketAddr,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HttpPublisher {
    /// Bind both listeners and start serving an empty Document.
    ///
    /// The HTTP port is taken as given; only the WebSocket port is retried.
    pub fn bind(config: &ServeConfig, docid: &str) -> Result<Self, PublishError> {
        let requested = SocketAddr::new(config.interface, config.port);
        let server = Server::http(requested).map_err(|source| PublishError::Bind {
            addr: requested,
            source,
        })?;
        let addr = server.server_addr().to_ip().unwrap_or(requested);
        let server = Arc::new(server);

        let ws = Broadcaster::bind(config.interface, config.websocket_port())?;

        let shared = Arc::new(Shared {
            docid: docid.to_string(),
            snapshot: ArcSwap::from_pointee(Document::new(docid)),
            revision: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            ws_port: ws.port(),
        });

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("livedoc-http-{i}"))
            .build()?;

        let handle = {
            let server = Arc::clone(&server);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("livedoc-http".into())
                .spawn(move || run_request_loop(&server, &pool, &shared))?
        };

        crate::log!("serve"; "http://{}", addr);

        Ok(Self {
            shared,
            server: Mutex::new(Some(server)),
            ws,
            addr,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ws_port(&self) -> u16 {
        self.shared.ws_port
    }

    /// Number of snapshots pushed so far.
    pub fn revision(&self) -> u64 {
        self.shared.revision.load(Ordering::Acquire)
    }

    /// The snapshot currently served.
    pub fn snapshot(&self) -> Arc<Document> {
        self.shared.snapshot.load_full()
    }

    /// Connected WebSocket clients.
    pub fn client_count(&self) -> usize {
        self.ws.client_count()
    }
}

impl Publisher for HttpPublisher {
    fn push(&self, document: Arc<Document>) {
        if self.shared.stopped.load(Ordering::Acquire) {
            return;
        }
        let revision = self.shared.revision.fetch_add(1, Ordering::AcqRel) + 1;
        let message = DocumentMessage::new(revision, &document).to_json();
        self.shared.snapshot.store(document);
        self.ws.broadcast(message);
    }

    fn stable_link(&self, document: &Document) -> String {
        format!(
            "http://{}:{}{}",
            link_host(self.addr.ip()),
            self.addr.port(),
            document_path(&document.docid)
        )
    }

    fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let server = self.server.lock().take();
        if let Some(server) = &server {
            server.unblock();
        }
        self.ws.stop();
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            crate::log!("serve"; "http thread panicked");
        }
        drop(server);
        crate::debug!("serve"; "publisher stopped");
    }
}

impl Drop for HttpPublisher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_request_loop(server: &Server, pool: &rayon::ThreadPool, shared: &Arc<Shared>) {
    for request in server.incoming_requests() {
        let shared = Arc::clone(shared);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &shared) {
                crate::log!("serve"; "request error: {e}");
            }
        });
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, shared: &Shared) -> Result<()> {
    if shared.stopped.load(Ordering::Acquire) {
        return response::respond_unavailable(request);
    }

    crate::debug!("serve"; "{} {}", request.method(), request.url());

    match route(request.method(), request.url(), &shared.docid) {
        Route::Root => response::respond_redirect(request, &document_path(&shared.docid)),
        Route::Page => {
            let document = shared.snapshot.load();
            let body = CLIENT_HTML.render(&ClientVars {
                ws_port: shared.ws_port,
                title: document.title.as_deref().unwrap_or(&document.docid),
                document_json: &serde_json::to_string(&**document)?,
            });
            response::respond_page(request, body)
        }
        Route::Snapshot => {
            let document = shared.snapshot.load();
            response::respond_json(request, serde_json::to_string(&**document)?)
        }
        Route::NotFound => response::respond_not_found(request),
    }
}
