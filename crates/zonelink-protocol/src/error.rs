//! Error types for the protocol layer.
//!
//! Each crate in Zonelink defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in turning frames into bytes
//! (or back), not in the connection itself or in the login sequence.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a frame into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a frame).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, or a frame
    /// that was truncated by the peer.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded fine but makes no sense at this point of the
    /// exchange, e.g. a `LoginOk` arriving before the handshake.
    #[error("unexpected frame: {0}")]
    Unexpected(String),
}
