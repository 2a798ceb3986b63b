//! Transport adapter layer for Zonelink.
//!
//! The session layer never touches sockets. It talks to a
//! [`TransportAdapter`]: a capability that can open a connection,
//! bootstrap encryption, send a login and close. None of these return a
//! result; the adapter reports every outcome later as a [`TransportEvent`] to
//! the listeners registered on it.
//!
//! Two adapters ship with the crate: [`WebSocketAdapter`] for real
//! servers and [`ScriptedAdapter`], an in-memory double for tests and
//! offline demos.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketAdapter`] via `tokio-tungstenite`

mod error;
mod event;
mod listener;
mod scripted;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use event::{EventKind, TransportEvent};
pub use listener::{Listener, ListenerId, ListenerSet, SharedListeners};
pub use scripted::{Request, RequestKind, ScriptedAdapter};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketAdapter;

use std::fmt;

use zonelink_protocol::LoginRequest;

/// What kind of connection an adapter makes. Decides which configured
/// port is used and whether HTTP tunnelling is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Raw TCP socket, with optional HTTP tunnel fallback.
    Socket,
    /// WebSocket over the HTTP(S) port. No tunnel fallback.
    WebSocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Socket => f.write_str("socket"),
            TransportKind::WebSocket => f.write_str("websocket"),
        }
    }
}

/// HTTP tunnel fallback parameters for socket transports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TunnelSettings {
    /// Fall back to HTTP tunnelling when the socket can't be opened.
    pub enabled: bool,
    /// Tunnel over HTTPS instead of HTTP.
    pub use_https: bool,
    pub http_port: u16,
    pub https_port: u16,
}

/// Everything an adapter needs to open a connection.
///
/// Derived from the session configuration for one specific
/// [`TransportKind`]; adapters use it as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSettings {
    pub host: String,
    /// The port to connect to, already selected for the transport kind.
    pub port: u16,
    /// Use a secure (TLS) channel for the connection itself.
    pub secure: bool,
    /// Zone announced during the handshake.
    pub zone: String,
    pub tunnel: TunnelSettings,
    /// Adapter-level debug output.
    pub debug: bool,
}

impl ConnectSettings {
    /// `host:port`, for logging and URL building.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The capability the session layer drives.
///
/// Every request returns immediately. Its outcome arrives later as a
/// [`TransportEvent`] delivered to the listeners registered for that
/// event's [`EventKind`]:
///
/// | request            | raises                                   |
/// |--------------------|------------------------------------------|
/// | `open`             | `Connection`                             |
/// | `init_encryption`  | `CryptoInit`                             |
/// | `send_login`       | `Login` or `LoginError`                  |
/// | `close`            | `ConnectionLost { reason: Manual }`      |
///
/// `ConnectionLost` can also arrive unprompted (kick, ban, idle timeout,
/// network failure). An adapter instance serves one connection attempt.
pub trait TransportAdapter: Send + 'static {
    /// The kind of connection this adapter makes.
    fn kind(&self) -> TransportKind;

    /// Starts connecting.
    fn open(&mut self, settings: &ConnectSettings);

    /// Starts the encryption bootstrap on an open connection.
    fn init_encryption(&mut self);

    /// Sends credentials on an open connection.
    fn send_login(&mut self, request: &LoginRequest);

    /// Closes the connection. The close counts as a manual disconnection.
    fn close(&mut self);

    /// Registers a listener for one event kind.
    fn add_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId;

    /// Removes a listener. Returns `false` if it was not registered;
    /// removing twice is never an error.
    fn remove_listener(&mut self, kind: EventKind, id: ListenerId) -> bool;
}
