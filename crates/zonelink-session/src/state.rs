//! Connection states and the transition table.
//!
//! ```text
//!   Idle ──start──→ Connecting ──ok, encrypt──→ EncryptionPending
//!                       │                              │ ok
//!                       │ ok, plain                    ▼
//!                       └──────────────────────→ Authenticating ──ok──→ Authenticated
//!
//!   any active state ──connection lost──→ Disconnected ──start──→ Connecting
//! ```
//!
//! Every legal (state, event) pair is listed in [`transition`]. Anything
//! not listed there is ignored by the machine.

use std::fmt;

use zonelink_protocol::DisconnectReason;
use zonelink_transport::TransportEvent;

/// Where a connection attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Nothing has been attempted yet.
    #[default]
    Idle,
    /// Waiting for the transport to connect.
    Connecting,
    /// Connected; waiting for the encryption bootstrap.
    EncryptionPending,
    /// Credentials sent; waiting for the verdict.
    Authenticating,
    /// Logged in.
    Authenticated,
    /// The last attempt is over and fully cleaned up.
    Disconnected,
}

impl ConnectionState {
    /// `true` while an attempt owns a transport, i.e. for every state
    /// except `Idle` and `Disconnected`.
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Idle | ConnectionState::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::EncryptionPending => "encryption_pending",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Authenticated => "authenticated",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// A request the machine issues to the transport as part of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    InitEncryption,
    SendLogin,
    Close,
}

/// What the observer is told about a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Notice {
    Connected,
    ConnectionFailed,
    EncryptionFailed(Option<String>),
    LoginSucceeded,
    LoginFailed(Option<String>),
    UnexpectedDisconnection(DisconnectReason),
}

/// The outcome of one legal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) next: ConnectionState,
    pub(crate) command: Option<Command>,
    pub(crate) notice: Option<Notice>,
}

impl Transition {
    fn to(next: ConnectionState) -> Self {
        Self {
            next,
            command: None,
            notice: None,
        }
    }

    fn issuing(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    fn notifying(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

/// Looks up what `event` does in `state`. `None` means the event is not
/// legal there.
///
/// Failures never jump to `Disconnected` themselves: they issue `Close`
/// and stay put, and the `ConnectionLost` that follows does the cleanup.
/// The one exception is a failed connect, which has nothing to close.
pub(crate) fn transition(
    state: ConnectionState,
    event: &TransportEvent,
    encrypt: bool,
) -> Option<Transition> {
    use ConnectionState::*;

    let step = match (state, event) {
        (Connecting, TransportEvent::Connection { success: true }) => {
            // The only place encryption is decided; both paths end in SendLogin.
            let step = if encrypt {
                Transition::to(EncryptionPending).issuing(Command::InitEncryption)
            } else {
                Transition::to(Authenticating).issuing(Command::SendLogin)
            };
            step.notifying(Notice::Connected)
        }
        (Connecting, TransportEvent::Connection { success: false }) => {
            Transition::to(Disconnected).notifying(Notice::ConnectionFailed)
        }

        (EncryptionPending, TransportEvent::CryptoInit { success: true, .. }) => {
            Transition::to(Authenticating).issuing(Command::SendLogin)
        }
        (
            EncryptionPending,
            TransportEvent::CryptoInit {
                success: false,
                error_message,
            },
        ) => Transition::to(EncryptionPending)
            .issuing(Command::Close)
            .notifying(Notice::EncryptionFailed(error_message.clone())),

        (Authenticating, TransportEvent::Login) => {
            Transition::to(Authenticated).notifying(Notice::LoginSucceeded)
        }
        (Authenticating, TransportEvent::LoginError { error_message }) => {
            Transition::to(Authenticating)
                .issuing(Command::Close)
                .notifying(Notice::LoginFailed(error_message.clone()))
        }

        (state, TransportEvent::ConnectionLost { reason }) if state.is_active() => {
            let step = Transition::to(Disconnected);
            if reason.is_manual() {
                step
            } else {
                step.notifying(Notice::UnexpectedDisconnection(*reason))
            }
        }

        _ => return None,
    };
    Some(step)
}

/// Events that end an attempt no matter what was requested before.
pub(crate) fn is_terminal(event: &TransportEvent) -> bool {
    matches!(
        event,
        TransportEvent::ConnectionLost { .. } | TransportEvent::Connection { success: false }
    )
}
