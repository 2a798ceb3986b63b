//! Error types for the session layer.

use zonelink_protocol::DisconnectReason;

use crate::ConnectionState;

/// Errors returned synchronously by the session layer.
///
/// These are caller mistakes: starting a second attempt, or handing over
/// a configuration with a required field missing. Failures of the
/// connection itself are asynchronous and show up as [`SessionFailure`]s.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A connection attempt is already in flight (or established).
    /// Log out and wait for the disconnection before starting another.
    #[error("a connection attempt is already active (state: {0})")]
    AlreadyConnecting(ConnectionState),

    /// A configuration field is missing or out of range.
    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}

/// Why a connection attempt or an established session failed.
///
/// The `Display` output is the message meant for the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFailure {
    /// The transport could not connect at all.
    #[error("Connection failed; is the server running at all?")]
    ConnectionFailed,

    /// The server refused to bootstrap encryption.
    #[error("Encryption initialization failed")]
    EncryptionFailed(Option<String>),

    /// The server rejected the credentials.
    #[error(
        "Login failed due to the following error:\n{}",
        .0.as_deref().unwrap_or("no reason given")
    )]
    LoginFailed(Option<String>),

    /// The session ended without the client asking for it.
    #[error(
        "An unexpected disconnection occurred; {}",
        .0.message().unwrap_or("reason is unknown.")
    )]
    UnexpectedDisconnection(DisconnectReason),
}
