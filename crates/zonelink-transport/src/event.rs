//! The canonical events every adapter raises.
//!
//! Whatever the underlying transport looks like, its callbacks collapse
//! into these five kinds. The session layer registers exactly one
//! listener per kind and never sees anything else.

use std::fmt;

use zonelink_protocol::DisconnectReason;

/// Which kind of event a listener is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Outcome of `open`.
    Connection,
    /// The connection ended (for any reason, including a requested close).
    ConnectionLost,
    /// Outcome of `init_encryption`.
    CryptoInit,
    /// Credentials accepted.
    Login,
    /// Credentials rejected.
    LoginError,
}

impl EventKind {
    /// Every kind, in registration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Connection,
        EventKind::ConnectionLost,
        EventKind::CryptoInit,
        EventKind::Login,
        EventKind::LoginError,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Connection => "connection",
            EventKind::ConnectionLost => "connection_lost",
            EventKind::CryptoInit => "crypto_init",
            EventKind::Login => "login",
            EventKind::LoginError => "login_error",
        };
        f.write_str(name)
    }
}

/// An event raised by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection attempt started by `open` finished.
    Connection { success: bool },

    /// The connection is gone. Raised exactly once per opened session.
    ConnectionLost { reason: DisconnectReason },

    /// Encryption bootstrap finished.
    CryptoInit {
        success: bool,
        error_message: Option<String>,
    },

    /// The server accepted the credentials.
    Login,

    /// The server rejected the credentials.
    LoginError { error_message: Option<String> },
}

impl TransportEvent {
    /// The listener kind this event is delivered to.
    pub fn kind(&self) -> EventKind {
        match self {
            TransportEvent::Connection { .. } => EventKind::Connection,
            TransportEvent::ConnectionLost { .. } => EventKind::ConnectionLost,
            TransportEvent::CryptoInit { .. } => EventKind::CryptoInit,
            TransportEvent::Login => EventKind::Login,
            TransportEvent::LoginError { .. } => EventKind::LoginError,
        }
    }
}
