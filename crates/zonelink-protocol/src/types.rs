//! Frames exchanged while a session is being established.
//!
//! Everything here is serialized onto the wire, so the serde attributes
//! ARE the protocol: renaming a variant or a field is a breaking change
//! for every server that speaks it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Version of the login handshake this client speaks.
///
/// Sent in [`ClientRequest::Handshake`]; the server echoes its own in
/// [`ServerReply::HandshakeAck`].
pub const API_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// DisconnectReason
// ---------------------------------------------------------------------------

/// Why a session ended.
///
/// Carried only on the final "connection lost" event. Servers send the
/// reason as a short lowercase string (`"manual"`, `"idle"`, `"kick"`,
/// `"ban"`); anything else is treated as [`DisconnectReason::Unknown`]
/// rather than rejected, so a newer server can add reasons without
/// breaking older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DisconnectReason {
    /// The client asked to close (logout, failed login, failed encryption).
    Manual,
    /// The server dropped the client after a period of inactivity.
    IdleTimeout,
    /// A moderator kicked the user.
    Kicked,
    /// A moderator banned the user.
    Banned,
    /// The connection dropped for a reason the server didn't report.
    Unknown,
}

impl DisconnectReason {
    /// Parses the server's reason string. Unrecognized strings map to
    /// [`DisconnectReason::Unknown`].
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "manual" => Self::Manual,
            "idle" => Self::IdleTimeout,
            "kick" => Self::Kicked,
            "ban" => Self::Banned,
            _ => Self::Unknown,
        }
    }

    /// The string the server uses for this reason.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::IdleTimeout => "idle",
            Self::Kicked => "kick",
            Self::Banned => "ban",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable explanation shown to the user.
    ///
    /// Returns `None` for [`DisconnectReason::Manual`]: a close the client
    /// asked for is never reported as an error.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Manual => None,
            Self::IdleTimeout => Some("you have been idle for too much time"),
            Self::Kicked => Some("you have been kicked"),
            Self::Banned => Some("you have been banned"),
            Self::Unknown => Some("reason is unknown."),
        }
    }

    /// `true` for a close the client asked for.
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl From<String> for DisconnectReason {
    fn from(reason: String) -> Self {
        Self::from_wire(&reason)
    }
}

impl From<DisconnectReason> for String {
    fn from(reason: DisconnectReason) -> Self {
        reason.as_wire().to_string()
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

// ---------------------------------------------------------------------------
// LoginRequest
// ---------------------------------------------------------------------------

/// Credentials presented to a zone.
///
/// `password` may be empty: guest zones accept a bare display name.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Zone (server-side application namespace) to log into.
    pub zone: String,
    /// Display name the user will appear under.
    pub user_name: String,
    /// Optional secret; empty for guest logins.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

/// Hand-written so passwords never end up in logs.
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("zone", &self.zone)
            .field("user_name", &self.user_name)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Frames the client sends during session establishment.
///
/// Internally tagged, so `InitCrypto` is `{"type":"init_crypto"}` and a
/// login is `{"type":"login","zone":…,"user_name":…}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// First frame on a fresh connection.
    Handshake { api_version: u32, zone: String },

    /// Ask the server to bootstrap protocol encryption.
    InitCrypto,

    /// Present credentials.
    Login(LoginRequest),
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Frames the server sends during session establishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerReply {
    /// The server accepted the handshake; the connection is usable.
    HandshakeAck { api_version: u32 },

    /// Result of an `InitCrypto` request.
    CryptoInit {
        success: bool,
        #[serde(default)]
        error_message: Option<String>,
    },

    /// Credentials accepted; the session is authenticated.
    LoginOk { user_name: String, zone: String },

    /// Credentials rejected.
    LoginError {
        #[serde(default)]
        error_message: Option<String>,
    },

    /// The server is about to close the connection, and why.
    Disconnect { reason: DisconnectReason },
}

// =========================================================================
// Tests
// =========================================================================
