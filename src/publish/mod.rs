//! Publisher - makes the current Document visible to browsers.
//!
//! The controller only sees the [`Publisher`] trait. The shipped
//! [`HttpPublisher`] serves a client page over HTTP and fans each snapshot
//! out over WebSocket:
//!
//! ```text
//! Controller ─push(Arc<Document>)─→ HttpPublisher ─┬─→ ArcSwap snapshot ←─ GET /<docid>/...
//!                                                  └─→ Broadcaster ─→ ws clients
//! ```

mod browser;
mod message;
mod response;
mod server;
mod ws;

pub use browser::{BrowserOpener, SystemBrowser};
pub use message::DocumentMessage;
pub use server::HttpPublisher;
pub use ws::Broadcaster;

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::document::Document;

/// External boundary the controller publishes through.
///
/// `push` is called from the controller thread only and must not block on
/// slow clients.
pub trait Publisher {
    /// Replace the published snapshot. Later pushes overwrite earlier ones.
    fn push(&self, document: Arc<Document>);

    /// URL a browser can keep open across reloads.
    fn stable_link(&self, document: &Document) -> String;

    /// Stop serving. Idempotent.
    fn stop(&self);
}

/// Fatal publisher setup errors.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to bind http server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to bind websocket server after {attempts} attempts (ports {first}-{last})")]
    WsBind {
        attempts: u16,
        first: u16,
        last: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create request pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("publisher i/o error")]
    Io(#[from] std::io::Error),
}
