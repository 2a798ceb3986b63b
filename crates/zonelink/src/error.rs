//! Unified error type for Zonelink.

use zonelink_protocol::ProtocolError;
use zonelink_session::{SessionError, SessionFailure};
use zonelink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `zonelink` facade you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// conversions let `?` lift sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ZonelinkError {
    /// A transport-level error (connect, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unexpected frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The request was refused before anything was sent (already
    /// connecting, invalid configuration).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The attempt reached the server and failed there.
    #[error(transparent)]
    Failure(#[from] SessionFailure),

    /// The connection ended before login completed, without a failure
    /// being reported.
    #[error("connection closed before login completed")]
    ConnectionClosed,
}

impl ZonelinkError {
    /// The lifecycle failure behind this error, if it is one.
    pub fn failure(&self) -> Option<&SessionFailure> {
        match self {
            ZonelinkError::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}
