use zonelink_protocol::ProtocolError;

/// Errors that can occur inside a transport adapter.
///
/// Adapter requests are fire-and-forget, so these never reach the
/// session layer directly: an adapter logs them and reports the outcome
/// as a [`TransportEvent`](crate::TransportEvent).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A frame could not be encoded, decoded, or was out of place.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
