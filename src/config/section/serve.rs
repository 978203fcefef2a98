//! `[serve]` section configuration.
//!
//! Contains publisher settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5006                 # HTTP port number
//! ws_port = 5007              # WebSocket port (default: port + 1)
//! open = true                 # Open a browser after the initial load
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5006;

/// Publisher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// WebSocket port. Falls back to the port after `port`.
    pub ws_port: Option<u16>,

    /// Open the stable link in a browser after the initial load.
    pub open: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            ws_port: None,
            open: true,
        }
    }
}

impl ServeConfig {
    /// First WebSocket port to try.
    ///
    /// An ephemeral HTTP port (`0`) gets an ephemeral WebSocket port too.
    pub fn websocket_port(&self) -> u16 {
        match (self.ws_port, self.port) {
            (Some(port), _) => port,
            (None, 0) => 0,
            (None, port) => port.saturating_add(1),
        }
    }
}
