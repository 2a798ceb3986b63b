//! The connection state machine.
//!
//! [`ConnectionMachine`] drives one connection attempt at a time from
//! "open the transport" to "authenticated", reacting to the events the
//! adapter raises. All state changes happen in
//! [`handle_transport_event`](ConnectionMachine::handle_transport_event),
//! one event at a time.
//!
//! # Cleanup
//!
//! Entering `Disconnected` is the only place an attempt is torn down:
//! listeners are unbound and the adapter is dropped. Failures that need
//! the connection closed (rejected login, failed encryption, logout)
//! request a close and wait for the `ConnectionLost` event to get there,
//! so teardown always runs through the same code.
//!
//! # Stalls
//!
//! There are no timeouts. If the adapter never answers a request, the
//! machine waits in the pending state until it does or until the caller
//! logs out.

use zonelink_protocol::DisconnectReason;
use zonelink_transport::{TransportAdapter, TransportEvent};

use crate::state::{Command, Notice, is_terminal, transition};
use crate::{
    ConnectionState, DispatchedEvent, Dispatcher, LifecycleObserver, SessionConfig, SessionError,
    Subscription,
};

/// Everything that belongs to one connection attempt. Dropped as a unit
/// on teardown.
struct Attempt<T> {
    config: SessionConfig,
    transport: T,
    subscription: Subscription,
    /// A close has been requested; only terminal events matter now.
    closing: bool,
}

impl<T: TransportAdapter> Attempt<T> {
    fn issue(&mut self, command: Command) {
        match command {
            Command::InitEncryption => {
                tracing::info!("initializing encryption");
                self.transport.init_encryption();
            }
            Command::SendLogin => {
                let request = self.config.login_request();
                tracing::info!(user_name = %request.user_name, zone = %request.zone, "performing login");
                self.transport.send_login(&request);
            }
            Command::Close => {
                tracing::debug!("requesting close");
                self.closing = true;
                self.transport.close();
            }
        }
    }
}

/// Drives a connection through transport setup, optional encryption, and
/// login.
///
/// Generic over the adapter `T` (one fresh instance per attempt) and the
/// observer `O` that is told about externally visible transitions.
///
/// # Example
///
/// ```rust
/// use zonelink_session::{ConnectionMachine, ConnectionState, LifecycleEvent, SessionConfig};
/// use zonelink_transport::{RequestKind, ScriptedAdapter, TransportEvent, TransportKind};
///
/// let transport = ScriptedAdapter::new(TransportKind::Socket);
/// transport.reply_to(RequestKind::Open, TransportEvent::Connection { success: true });
/// transport.reply_to(RequestKind::SendLogin, TransportEvent::Login);
///
/// let mut machine = ConnectionMachine::new(Vec::<LifecycleEvent>::new());
/// let config = SessionConfig::builder("alice").build().unwrap();
/// machine.start_connection(config, transport).unwrap();
/// machine.process_events();
///
/// assert_eq!(machine.state(), ConnectionState::Authenticated);
/// ```
pub struct ConnectionMachine<T: TransportAdapter, O: LifecycleObserver> {
    state: ConnectionState,
    observer: O,
    dispatcher: Dispatcher,
    attempt: Option<Attempt<T>>,
}

impl<T: TransportAdapter, O: LifecycleObserver> ConnectionMachine<T, O> {
    /// Creates an idle machine reporting to `observer`.
    pub fn new(observer: O) -> Self {
        Self {
            state: ConnectionState::Idle,
            observer,
            dispatcher: Dispatcher::new(),
            attempt: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Configuration of the active attempt, if any.
    pub fn config(&self) -> Option<&SessionConfig> {
        self.attempt.as_ref().map(|a| &a.config)
    }

    /// `true` once a close has been requested for the active attempt.
    pub fn is_closing(&self) -> bool {
        self.attempt.as_ref().is_some_and(|a| a.closing)
    }

    // -----------------------------------------------------------------------
    // Caller operations
    // -----------------------------------------------------------------------

    /// Starts a connection attempt with `transport`.
    ///
    /// Registers listeners on the transport, then asks it to open with
    /// settings derived from `config` for the transport's kind.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyConnecting`] if an attempt is active. Nothing
    ///   is changed and `transport` is dropped unused.
    /// - [`SessionError::InvalidConfig`] if `config` fails validation.
    pub fn start_connection(
        &mut self,
        config: SessionConfig,
        mut transport: T,
    ) -> Result<(), SessionError> {
        if self.state.is_active() {
            tracing::warn!(state = %self.state, "connection attempt already active");
            return Err(SessionError::AlreadyConnecting(self.state));
        }
        config.validate()?;

        let subscription = self.dispatcher.bind(&mut transport);
        let settings = config.connect_settings(transport.kind());
        tracing::info!(
            attempt = %subscription.attempt(),
            address = %settings.address(),
            transport = %transport.kind(),
            zone = %settings.zone,
            "attempting connection"
        );

        self.state = ConnectionState::Connecting;
        self.attempt = Some(Attempt {
            config,
            transport,
            subscription,
            closing: false,
        });
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.transport.open(&settings);
        }
        Ok(())
    }

    /// Asks the transport to close the active session.
    ///
    /// The machine stays in its current state until the resulting
    /// `ConnectionLost` event arrives. Calling this with nothing active,
    /// or again before that event, does nothing.
    pub fn logout(&mut self) {
        self.request_close("logout requested");
    }

    /// Same as [`logout`](Self::logout), for application shutdown.
    pub fn shutdown(&mut self) {
        self.request_close("shutting down");
    }

    fn request_close(&mut self, why: &'static str) {
        match self.attempt.as_mut() {
            Some(attempt) if !attempt.closing => {
                tracing::info!(state = %self.state, "{why}");
                attempt.issue(Command::Close);
            }
            Some(_) => tracing::debug!("close already requested"),
            None => tracing::debug!("no active connection, nothing to close"),
        }
    }

    // -----------------------------------------------------------------------
    // Event handling
    // -----------------------------------------------------------------------

    /// Handles every event currently queued, in order, without waiting.
    /// Returns how many were taken off the queue.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(dispatched) = self.dispatcher.try_next() {
            self.dispatch(dispatched);
            handled += 1;
        }
        handled
    }

    /// Waits for the next queued event and handles it.
    pub async fn next_event(&mut self) {
        if let Some(dispatched) = self.dispatcher.next().await {
            self.dispatch(dispatched);
        }
    }

    fn dispatch(&mut self, dispatched: DispatchedEvent) {
        let current = self.attempt.as_ref().map(|a| a.subscription.attempt());
        if current != Some(dispatched.attempt) {
            tracing::debug!(
                attempt = %dispatched.attempt,
                kind = %dispatched.event.kind(),
                "discarding event from a finished attempt"
            );
            return;
        }
        self.handle_transport_event(dispatched.event);
    }

    /// Applies one event from the active attempt's transport.
    ///
    /// Events that are not legal in the current state are logged and
    /// ignored. While a close is pending, only events that end the
    /// attempt are applied.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        tracing::trace!(state = %self.state, ?event, "transport event");

        let Some(attempt) = self.attempt.as_mut() else {
            tracing::warn!(kind = %event.kind(), "event with no active connection, ignoring");
            return;
        };

        if attempt.closing && !is_terminal(&event) {
            tracing::debug!(kind = %event.kind(), "close pending, ignoring event");
            return;
        }

        let Some(mut step) = transition(self.state, &event, attempt.config.encrypt) else {
            tracing::warn!(
                state = %self.state,
                kind = %event.kind(),
                "event not valid in current state, ignoring"
            );
            return;
        };

        // The caller already asked to close; a connect failure is expected.
        if attempt.closing && step.notice == Some(Notice::ConnectionFailed) {
            step.notice = None;
        }

        let kind = attempt.transport.kind();
        if let Some(command) = step.command {
            attempt.issue(command);
        }

        if step.next != self.state {
            tracing::debug!(from = %self.state, to = %step.next, "state changed");
            self.state = step.next;
        }
        if step.next == ConnectionState::Disconnected {
            self.teardown(&event);
        }

        if let Some(notice) = step.notice {
            self.notify(notice, kind);
        }
    }

    /// Unbinds listeners and drops the adapter.
    fn teardown(&mut self, cause: &TransportEvent) {
        let Some(mut attempt) = self.attempt.take() else {
            return;
        };
        attempt.subscription.unbind(&mut attempt.transport);

        match cause {
            TransportEvent::ConnectionLost { reason } => {
                tracing::info!(%reason, "connection lost");
            }
            _ => tracing::info!("connection attempt ended"),
        }
    }

    fn notify(&mut self, notice: Notice, kind: zonelink_transport::TransportKind) {
        match notice {
            Notice::Connected => {
                tracing::info!(transport = %kind, "connection established");
                self.observer.on_connected(kind);
            }
            Notice::ConnectionFailed => {
                tracing::info!("connection failed");
                self.observer.on_connection_failed();
            }
            Notice::EncryptionFailed(message) => {
                tracing::warn!(error = message.as_deref().unwrap_or(""), "encryption initialization failed");
                self.observer.on_encryption_failed(message.as_deref());
            }
            Notice::LoginSucceeded => {
                tracing::info!("login successful");
                self.observer.on_login_succeeded();
            }
            Notice::LoginFailed(message) => {
                tracing::info!(error = message.as_deref().unwrap_or(""), "login failed");
                self.observer.on_login_failed(message.as_deref());
            }
            Notice::UnexpectedDisconnection(reason) => {
                let message = unexpected_message(reason);
                tracing::warn!(%reason, text = message, "unexpected disconnection");
                self.observer.on_unexpected_disconnection(reason, message);
            }
        }
    }
}

fn unexpected_message(reason: DisconnectReason) -> &'static str {
    // Manual closes never get here; fall back to the unknown text anyway.
    reason
        .message()
        .or(DisconnectReason::Unknown.message())
        .unwrap_or_default()
}
