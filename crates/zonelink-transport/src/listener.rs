//! Listener bookkeeping for adapters.
//!
//! An adapter has to remember who subscribed to which [`EventKind`] and
//! forget them again on request. [`ListenerSet`] does exactly that and
//! nothing more, so every adapter (and every test double) can embed it
//! instead of re-implementing registration.
//!
//! Removal is by [`ListenerId`], never by comparing handlers: closures
//! have no useful identity in Rust.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{EventKind, TransportEvent};

/// Handle returned by `add_listener`, needed to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// A callback invoked for every event of the kind it was registered for.
///
/// Listeners must return quickly: adapters call them from their I/O path.
/// The session layer's listeners only push onto a queue.
pub type Listener = Box<dyn Fn(&TransportEvent) + Send + 'static>;

// ---------------------------------------------------------------------------
// ListenerSet
// ---------------------------------------------------------------------------

/// The listeners currently registered on one adapter.
#[derive(Default)]
pub struct ListenerSet {
    next_id: u64,
    entries: Vec<(EventKind, ListenerId, Listener)>,
}

impl ListenerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `kind` and returns its id.
    pub fn add(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((kind, id, listener));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered
    /// (already removed, or registered under another kind).
    pub fn remove(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|(k, existing, _)| !(*k == kind && *existing == id));
        self.entries.len() != before
    }

    /// Delivers `event` to every listener registered for its kind, in
    /// registration order. Returns how many listeners were called.
    pub fn emit(&self, event: &TransportEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for (_, _, listener) in self.entries.iter().filter(|(k, _, _)| *k == kind) {
            listener(event);
            delivered += 1;
        }
        delivered
    }

    /// Number of listeners registered for `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|(k, _, _)| *k == kind).count()
    }

    /// Total number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.entries.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SharedListeners
// ---------------------------------------------------------------------------

/// A [`ListenerSet`] shared between an adapter handle and the background
/// task doing its I/O.
///
/// The lock is only held while registering or while calling listeners,
/// both of which are short. A poisoned lock is recovered: a panicking
/// listener must not take the adapter down with it.
#[derive(Debug, Clone, Default)]
pub struct SharedListeners(Arc<Mutex<ListenerSet>>);

impl SharedListeners {
    /// Creates an empty shared set.
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`ListenerSet::add`].
    pub fn add(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(kind, listener)
    }

    /// See [`ListenerSet::remove`].
    pub fn remove(&self, kind: EventKind, id: ListenerId) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(kind, id)
    }

    /// See [`ListenerSet::emit`].
    pub fn emit(&self, event: &TransportEvent) -> usize {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(event)
    }

    /// Total number of registered listeners.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
