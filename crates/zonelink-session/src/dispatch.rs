//! Event dispatch: from adapter listeners to one serialized queue.
//!
//! The [`Dispatcher`] owns the only event queue the machine reads. Binding
//! it to an adapter registers one listener per [`EventKind`]; each
//! listener does nothing but push the event onto the queue, tagged with
//! the attempt it belongs to. The machine then takes events off the
//! queue one at a time, in the order the adapter raised them.
//!
//! The tag matters after a teardown: events the old adapter raised just
//! before its listeners were removed may still be queued when the next
//! attempt starts, and must not drive it.

use std::fmt;

use tokio::sync::mpsc;
use zonelink_transport::{EventKind, ListenerId, TransportAdapter, TransportEvent};

/// Identifies one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

/// A queued event and the attempt whose adapter raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub attempt: AttemptId,
    pub event: TransportEvent,
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// The listeners one attempt registered on its adapter.
///
/// Dropping a `Subscription` does not remove anything (it has no access
/// to the adapter); call [`unbind`](Self::unbind).
#[derive(Debug)]
#[must_use = "listeners stay registered until the subscription is unbound"]
pub struct Subscription {
    attempt: AttemptId,
    registrations: Vec<(EventKind, ListenerId)>,
}

impl Subscription {
    /// The attempt these listeners deliver for.
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Removes every listener from `transport`. Returns how many were
    /// removed; a second call removes nothing and is not an error.
    pub fn unbind<T: TransportAdapter>(&mut self, transport: &mut T) -> usize {
        let mut removed = 0;
        for (kind, id) in self.registrations.drain(..) {
            if transport.remove_listener(kind, id) {
                removed += 1;
            } else {
                tracing::debug!(%kind, %id, "listener was already gone");
            }
        }
        if removed > 0 {
            tracing::debug!(attempt = %self.attempt, removed, "listeners unbound");
        }
        removed
    }

    /// `true` until [`unbind`](Self::unbind) has run.
    pub fn is_bound(&self) -> bool {
        !self.registrations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Owner of the event queue.
#[derive(Debug)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<DispatchedEvent>,
    rx: mpsc::UnboundedReceiver<DispatchedEvent>,
    attempts: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            attempts: 0,
        }
    }

    /// Registers one listener per event kind on `transport` for a new
    /// attempt, and returns the subscription that removes them again.
    pub fn bind<T: TransportAdapter>(&mut self, transport: &mut T) -> Subscription {
        self.attempts += 1;
        let attempt = AttemptId(self.attempts);

        let registrations = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let tx = self.tx.clone();
                let id = transport.add_listener(
                    kind,
                    Box::new(move |event: &TransportEvent| {
                        // The receiver lives as long as the dispatcher; a failed
                        // send means the whole machine is gone.
                        let _ = tx.send(DispatchedEvent {
                            attempt,
                            event: event.clone(),
                        });
                    }),
                );
                (kind, id)
            })
            .collect();

        tracing::debug!(%attempt, "listeners bound");
        Subscription {
            attempt,
            registrations,
        }
    }

    /// Takes the next queued event without waiting.
    pub fn try_next(&mut self) -> Option<DispatchedEvent> {
        self.rx.try_recv().ok()
    }

    /// Waits for the next queued event.
    pub async fn next(&mut self) -> Option<DispatchedEvent> {
        self.rx.recv().await
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use zonelink_protocol::DisconnectReason;
    use zonelink_transport::{ScriptedAdapter, TransportKind};

    use super::*;

    fn adapter() -> ScriptedAdapter {
        ScriptedAdapter::new(TransportKind::Socket)
    }

    #[test]
    fn test_bind_registers_one_listener_per_kind() {
        let mut dispatcher = Dispatcher::new();
        let mut transport = adapter();

        let subscription = dispatcher.bind(&mut transport);

        assert_eq!(transport.listener_count(), EventKind::ALL.len());
        assert!(subscription.is_bound());
    }

    #[test]
    fn test_unbind_removes_everything_and_is_idempotent() {
        let mut dispatcher = Dispatcher::new();
        let mut transport = adapter();
        let mut subscription = dispatcher.bind(&mut transport);

        assert_eq!(subscription.unbind(&mut transport), 5);
        assert_eq!(subscription.unbind(&mut transport), 0);
        assert_eq!(transport.listener_count(), 0);
        assert!(!subscription.is_bound());
    }

    #[test]
    fn test_events_are_queued_in_raise_order_with_attempt_tag() {
        let mut dispatcher = Dispatcher::new();
        let transport = adapter();
        let subscription = dispatcher.bind(&mut transport.clone());

        transport.emit(TransportEvent::Connection { success: true });
        transport.emit(TransportEvent::Login);
        transport.emit(TransportEvent::ConnectionLost {
            reason: DisconnectReason::Kicked,
        });

        let kinds: Vec<_> = std::iter::from_fn(|| dispatcher.try_next())
            .map(|d| {
                assert_eq!(d.attempt, subscription.attempt());
                d.event.kind()
            })
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::Connection, EventKind::Login, EventKind::ConnectionLost]
        );
    }

    #[test]
    fn test_each_bind_gets_a_new_attempt_id() {
        let mut dispatcher = Dispatcher::new();
        let first = dispatcher.bind(&mut adapter());
        let second = dispatcher.bind(&mut adapter());
        assert_ne!(first.attempt(), second.attempt());
    }

    #[test]
    fn test_nothing_queued_after_unbind() {
        let mut dispatcher = Dispatcher::new();
        let mut transport = adapter();
        let mut subscription = dispatcher.bind(&mut transport);
        subscription.unbind(&mut transport);

        assert_eq!(transport.emit(TransportEvent::Login), 0);
        assert!(dispatcher.try_next().is_none());
    }
}
