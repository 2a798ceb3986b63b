//! The lifecycle observer contract.
//!
//! The machine reports what happened to the connection through
//! [`LifecycleObserver`] and knows nothing about who listens: a UI, a
//! logger, or an async task at the other end of a channel
//! ([`ChannelObserver`]).
//!
//! Observer methods are called from inside event handling, so they must
//! return quickly and must not block.

use tokio::sync::mpsc;
use zonelink_protocol::DisconnectReason;
use zonelink_transport::TransportKind;

use crate::SessionFailure;

/// Receives externally visible lifecycle transitions.
///
/// At most one method is called per transition.
pub trait LifecycleObserver {
    /// The transport connected. Encryption or login follows.
    fn on_connected(&mut self, _kind: TransportKind) {}

    /// The transport could not connect.
    fn on_connection_failed(&mut self);

    /// The encryption bootstrap failed; the connection is being closed.
    fn on_encryption_failed(&mut self, message: Option<&str>);

    /// The session is authenticated.
    fn on_login_succeeded(&mut self);

    /// The credentials were rejected; the connection is being closed.
    fn on_login_failed(&mut self, message: Option<&str>);

    /// The session ended without the client asking for it. `message` is
    /// the fixed human-readable text for `reason`.
    fn on_unexpected_disconnection(&mut self, reason: DisconnectReason, message: &str);
}

/// A lifecycle transition as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connected(TransportKind),
    LoginSucceeded,
    Failed(SessionFailure),
}

impl LifecycleEvent {
    /// The failure carried by this event, if it is one.
    pub fn failure(&self) -> Option<&SessionFailure> {
        match self {
            LifecycleEvent::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

mod sealed {
    use super::LifecycleEvent;

    /// A destination for lifecycle events built by the blanket observer
    /// impl below.
    pub trait Record {
        fn record(&mut self, event: LifecycleEvent);
    }
}

use sealed::Record;

impl<R: Record> LifecycleObserver for R {
    fn on_connected(&mut self, kind: TransportKind) {
        self.record(LifecycleEvent::Connected(kind));
    }

    fn on_connection_failed(&mut self) {
        self.record(LifecycleEvent::Failed(SessionFailure::ConnectionFailed));
    }

    fn on_encryption_failed(&mut self, message: Option<&str>) {
        self.record(LifecycleEvent::Failed(SessionFailure::EncryptionFailed(
            message.map(str::to_owned),
        )));
    }

    fn on_login_succeeded(&mut self) {
        self.record(LifecycleEvent::LoginSucceeded);
    }

    fn on_login_failed(&mut self, message: Option<&str>) {
        self.record(LifecycleEvent::Failed(SessionFailure::LoginFailed(
            message.map(str::to_owned),
        )));
    }

    fn on_unexpected_disconnection(&mut self, reason: DisconnectReason, _message: &str) {
        self.record(LifecycleEvent::Failed(
            SessionFailure::UnexpectedDisconnection(reason),
        ));
    }
}

/// Records every transition in order. Handy in tests and for callers
/// that poll.
impl Record for Vec<LifecycleEvent> {
    fn record(&mut self, event: LifecycleEvent) {
        self.push(event);
    }
}

// ---------------------------------------------------------------------------
// ChannelObserver
// ---------------------------------------------------------------------------

/// Forwards every transition into an unbounded channel.
///
/// Sending never blocks. Once the receiver is dropped, transitions are
/// silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Record for ChannelObserver {
    fn record(&mut self, event: LifecycleEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("lifecycle receiver dropped, event discarded");
        }
    }
}
