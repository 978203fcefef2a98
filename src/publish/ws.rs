//! WebSocket broadcaster for document snapshots.
//!
//! Two threads: one accepts and handshakes new clients, one polls connected
//! clients for close frames and flushes queued writes. Broadcasting happens
//! on the caller's thread.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::PublishError;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Poll interval for the accept and reader loops
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on a client's opening handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Clients {
    list: Vec<WebSocket<TcpStream>>,
    /// Last broadcast frame, replayed to clients that connect later.
    latest: Option<String>,
}

#[derive(Default)]
struct Shared {
    clients: Mutex<Clients>,
    stopped: AtomicBool,
}

/// Fan-out of text frames to every connected client.
pub struct Broadcaster {
    port: u16,
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Broadcaster {
    /// Listen on `interface:base_port`, trying the next ports if it is taken.
    pub fn bind(interface: IpAddr, base_port: u16) -> Result<Self, PublishError> {
        let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        if base_port != 0 && port != base_port {
            crate::log!("serve"; "websocket port {} in use, using {} instead", base_port, port);
        }
        listener.set_nonblocking(true)?;

        let shared = Arc::new(Shared::default());

        let accept = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("livedoc-ws-accept".into())
                .spawn(move || accept_loop(&listener, &shared))?
        };
        let reader = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("livedoc-ws-read".into())
                .spawn(move || reader_loop(&shared))?
        };

        crate::debug!("serve"; "ws://{}", SocketAddr::new(interface, port));

        Ok(Self {
            port,
            shared,
            threads: Mutex::new(vec![accept, reader]),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.shared.clients.lock().list.len()
    }

    /// Send a frame to every client and remember it for late joiners.
    pub fn broadcast(&self, text: String) {
        if self.shared.stopped.load(Ordering::Acquire) {
            return;
        }

        let mut clients = self.shared.clients.lock();
        let msg = Message::Text(text.clone().into());
        clients.latest = Some(text);

        let count = clients.list.len();
        if count == 0 {
            crate::debug!("ws"; "no clients connected");
            return;
        }

        clients.list.retain_mut(|ws| match ws.send(msg.clone()) {
            Ok(()) => true,
            // Queued in the write buffer; the reader loop flushes it.
            Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
            Err(e) => {
                crate::debug!("ws"; "client disconnected: {}", e);
                false
            }
        });
        crate::debug!("ws"; "broadcast to {} clients", count);
    }

    /// Close every client and stop both threads. Idempotent.
    pub fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        {
            let mut clients = self.shared.clients.lock();
            for mut ws in clients.list.drain(..) {
                let _ = ws.close(None);
                let _ = ws.flush();
            }
        }

        for handle in self.threads.lock().drain(..) {
            if handle.join().is_err() {
                crate::log!("ws"; "websocket thread panicked");
            }
        }
        crate::debug!("ws"; "stopped");
    }
}

impl Drop for Broadcaster {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(listener: &TcpListener, shared: &Shared) {
    while !shared.stopped.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("ws"; "client connected: {}", addr);
                if let Some(ws) = handshake(stream) {
                    register(shared, ws);
                }
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                crate::log!("ws"; "accept error: {}", e);
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// Blocking handshake, then switch to non-blocking for polling reads.
fn handshake(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT));

    match tungstenite::accept(stream) {
        Ok(ws) => {
            let _ = ws.get_ref().set_read_timeout(None);
            let _ = ws.get_ref().set_nonblocking(true);
            Some(ws)
        }
        Err(e) => {
            crate::log!("ws"; "handshake failed: {}", e);
            None
        }
    }
}

/// Replay the latest frame and add the client, under one lock so a
/// concurrent broadcast is seen exactly once.
fn register(shared: &Shared, mut ws: WebSocket<TcpStream>) {
    let mut clients = shared.clients.lock();
    if shared.stopped.load(Ordering::Acquire) {
        let _ = ws.close(None);
        return;
    }

    if let Some(latest) = &clients.latest {
        match ws.send(Message::Text(latest.clone().into())) {
            Ok(()) => {}
            Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => {
                crate::log!("ws"; "failed to send snapshot: {}", e);
                return;
            }
        }
    }

    clients.list.push(ws);
    crate::debug!("ws"; "client registered (total: {})", clients.list.len());
}

/// Drop clients that closed or errored; flush pending writes for the rest.
fn reader_loop(shared: &Shared) {
    while !shared.stopped.load(Ordering::Acquire) {
        thread::sleep(POLL_INTERVAL);

        let mut clients = shared.clients.lock();
        clients.list.retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => {
                match ws.flush() {
                    Ok(()) => true,
                    Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
                    Err(_) => false,
                }
            }
            Err(_) => false,
        });
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(TcpListener, u16), PublishError> {
    let mut last_error = None;
    let mut last_port = base_port;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        last_port = port;
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(PublishError::WsBind {
        attempts: max_retries,
        first: base_port,
        last: last_port,
        source: last_error.unwrap_or_else(|| std::io::Error::other("no port attempted")),
    })
}
