//! An in-memory adapter driven by the caller.
//!
//! [`ScriptedAdapter`] records every request it receives and raises
//! whatever events it is told to, either on demand ([`emit`]) or as an
//! automatic reply to the next request of a given kind ([`reply_to`]).
//! Clones share state, so a test can hand one clone to the code under
//! test and keep another to drive and inspect it.
//!
//! [`emit`]: ScriptedAdapter::emit
//! [`reply_to`]: ScriptedAdapter::reply_to

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use zonelink_protocol::LoginRequest;

use crate::{
    ConnectSettings, EventKind, Listener, ListenerId, SharedListeners, TransportAdapter,
    TransportEvent, TransportKind,
};

/// A request the adapter received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Open(ConnectSettings),
    InitEncryption,
    SendLogin(LoginRequest),
    Close,
}

impl Request {
    /// The kind of this request.
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Open(_) => RequestKind::Open,
            Request::InitEncryption => RequestKind::InitEncryption,
            Request::SendLogin(_) => RequestKind::SendLogin,
            Request::Close => RequestKind::Close,
        }
    }
}

/// Request kinds, used to script automatic replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Open,
    InitEncryption,
    SendLogin,
    Close,
}

#[derive(Debug, Default)]
struct Script {
    requests: Vec<Request>,
    replies: VecDeque<(RequestKind, TransportEvent)>,
}

/// See the [module docs](self).
#[derive(Debug, Clone)]
pub struct ScriptedAdapter {
    kind: TransportKind,
    script: Arc<Mutex<Script>>,
    listeners: SharedListeners,
}

impl ScriptedAdapter {
    /// Creates an adapter that reports itself as `kind`.
    pub fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            script: Arc::default(),
            listeners: SharedListeners::new(),
        }
    }

    /// Queues `event` to be raised when the next `request` arrives.
    ///
    /// Replies are consumed in the order they were queued; a request
    /// with no queued reply raises nothing.
    pub fn reply_to(&self, request: RequestKind, event: TransportEvent) -> &Self {
        self.lock().replies.push_back((request, event));
        self
    }

    /// Raises `event` now. Returns how many listeners received it.
    pub fn emit(&self, event: TransportEvent) -> usize {
        self.listeners.emit(&event)
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    /// How many requests of `kind` were received.
    pub fn count(&self, kind: RequestKind) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.kind() == kind)
            .count()
    }

    /// Number of listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, request: Request) {
        let kind = request.kind();
        let reply = {
            let mut script = self.lock();
            script.requests.push(request);
            let position = script.replies.iter().position(|(k, _)| *k == kind);
            position.and_then(|i| script.replies.remove(i))
        };
        // Lock released before listeners run.
        if let Some((_, event)) = reply {
            self.listeners.emit(&event);
        }
    }
}

impl TransportAdapter for ScriptedAdapter {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn open(&mut self, settings: &ConnectSettings) {
        self.record(Request::Open(settings.clone()));
    }

    fn init_encryption(&mut self) {
        self.record(Request::InitEncryption);
    }

    fn send_login(&mut self, request: &LoginRequest) {
        self.record(Request::SendLogin(request.clone()));
    }

    fn close(&mut self) {
        self.record(Request::Close);
    }

    fn add_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn remove_listener(&mut self, kind: EventKind, id: ListenerId) -> bool {
        self.listeners.remove(kind, id)
    }
}
