//! The async client driver.
//!
//! [`Client`] owns a [`ConnectionMachine`] and pumps its event queue on
//! the current Tokio task, turning the machine's callbacks into awaitable
//! operations: `connect` resolves once the login outcome is known,
//! `logout` once the connection is gone.

use tokio::sync::mpsc;
use zonelink_protocol::DisconnectReason;
use zonelink_session::{
    ChannelObserver, ConnectionMachine, ConnectionState, LifecycleEvent, SessionConfig,
    SessionFailure,
};
use zonelink_transport::TransportAdapter;

use crate::ZonelinkError;

/// Drives one connection at a time over adapters of type `T`.
///
/// # Example
///
/// ```rust,no_run
/// use zonelink::prelude::*;
///
/// # async fn run() -> Result<(), ZonelinkError> {
/// let config = SessionConfig::builder("alice").zone("Lobby").build()?;
/// let mut client = Client::new();
/// client.connect(config, WebSocketAdapter::new()).await?;
/// client.logout().await;
/// # Ok(())
/// # }
/// ```
pub struct Client<T: TransportAdapter> {
    machine: ConnectionMachine<T, ChannelObserver>,
    lifecycle: mpsc::UnboundedReceiver<LifecycleEvent>,
    events: Vec<LifecycleEvent>,
}

impl<T: TransportAdapter> Client<T> {
    pub fn new() -> Self {
        let (observer, lifecycle) = ChannelObserver::new();
        Self {
            machine: ConnectionMachine::new(observer),
            lifecycle,
            events: Vec::new(),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Every lifecycle event observed so far, oldest first.
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Connects with `transport` and logs in.
    ///
    /// Returns once the server has accepted the login. On failure the
    /// connection is first wound down to `Disconnected`, so a new attempt
    /// can start right away.
    ///
    /// Waits forever if the server never answers; wrap the call in
    /// `tokio::time::timeout` to bound it.
    ///
    /// # Errors
    /// - [`ZonelinkError::Session`] if the attempt could not start.
    /// - [`ZonelinkError::Failure`] with what went wrong on the way.
    /// - [`ZonelinkError::ConnectionClosed`] if the connection ended
    ///   silently before login.
    pub async fn connect(
        &mut self,
        config: SessionConfig,
        transport: T,
    ) -> Result<(), ZonelinkError> {
        self.machine.start_connection(config, transport)?;

        loop {
            match self.pump().await {
                Some(LifecycleEvent::LoginSucceeded) => return Ok(()),
                Some(LifecycleEvent::Connected(_)) => continue,
                Some(LifecycleEvent::Failed(failure)) => {
                    self.settle().await;
                    return Err(failure.into());
                }
                None => return Err(ZonelinkError::ConnectionClosed),
            }
        }
    }

    /// Closes the connection and waits until it is gone. Does nothing if
    /// there is no connection.
    pub async fn logout(&mut self) {
        self.machine.logout();
        self.settle().await;
    }

    /// Same as [`logout`](Self::logout), for application shutdown.
    pub async fn shutdown(&mut self) {
        self.machine.shutdown();
        self.settle().await;
    }

    /// Keeps the session running until it ends.
    ///
    /// Returns the reason if the server or network ended it, `None` if it
    /// was closed on request or was not running.
    pub async fn run_until_disconnected(&mut self) -> Option<DisconnectReason> {
        let mut reason = None;
        while let Some(event) = self.pump().await {
            if let Some(SessionFailure::UnexpectedDisconnection(r)) = event.failure() {
                reason = Some(*r);
            }
        }
        reason
    }

    /// Pumps until the machine is inactive and every event is collected.
    async fn settle(&mut self) {
        while self.pump().await.is_some() {}
    }

    /// Returns the next lifecycle event, pumping the machine until one is
    /// available. `None` once the machine is inactive and nothing is left.
    async fn pump(&mut self) -> Option<LifecycleEvent> {
        self.machine.process_events();
        loop {
            if let Ok(event) = self.lifecycle.try_recv() {
                tracing::debug!(?event, "lifecycle event");
                self.events.push(event.clone());
                return Some(event);
            }
            if !self.machine.state().is_active() {
                return None;
            }
            self.machine.next_event().await;
        }
    }
}

impl<T: TransportAdapter> Default for Client<T> {
    fn default() -> Self {
        Self::new()
    }
}
