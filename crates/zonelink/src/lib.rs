//! # Zonelink
//!
//! Connect to a zone server, optionally bootstrap encryption, and log in.
//!
//! Zonelink splits the client into layers: a wire vocabulary
//! (`zonelink-protocol`), transport adapters that open connections and
//! raise events (`zonelink-transport`), and the connection state machine
//! that decides what happens next (`zonelink-session`). This crate ties
//! them together behind one error type and an async [`Client`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zonelink::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ZonelinkError> {
//!     let config = SessionConfig::builder("alice").zone("Lobby").build()?;
//!     zonelink::init_logging(&config);
//!
//!     let mut client = Client::new();
//!     client.connect(config, WebSocketAdapter::new()).await?;
//!     if let Some(reason) = client.run_until_disconnected().await {
//!         println!("disconnected: {reason}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Callers that run their own loop can use [`ConnectionMachine`]
//! directly and call `process_events` once per frame.

mod client;
mod error;
mod logging;

pub use client::Client;
pub use error::ZonelinkError;
pub use logging::{env_filter, init_logging};

pub use zonelink_protocol::{DisconnectReason, LoginRequest};
pub use zonelink_session::{
    ChannelObserver, ConnectionMachine, ConnectionState, LifecycleEvent, LifecycleObserver,
    LogLevel, SessionConfig, SessionConfigBuilder, SessionError, SessionFailure,
};
pub use zonelink_transport::{
    RequestKind, ScriptedAdapter, TransportAdapter, TransportEvent, TransportKind,
    WebSocketAdapter,
};

/// Everything a typical client needs, in one import.
pub mod prelude {
    pub use crate::{
        Client, ConnectionMachine, ConnectionState, DisconnectReason, LifecycleEvent,
        LifecycleObserver, SessionConfig, SessionFailure, TransportAdapter, TransportKind,
        WebSocketAdapter, ZonelinkError,
    };
}
