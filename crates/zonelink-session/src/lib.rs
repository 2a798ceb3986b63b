//! Connection lifecycle for Zonelink clients.
//!
//! This crate takes a client from "not connected" to "logged into a zone":
//!
//! 1. **Configuration**: where to connect and as whom ([`SessionConfig`])
//! 2. **State machine**: open, optionally encrypt, log in, and react to
//!    disconnects ([`ConnectionMachine`], [`ConnectionState`])
//! 3. **Dispatch**: adapter callbacks turned into one ordered event
//!    queue ([`Dispatcher`])
//! 4. **Reporting**: what the outside world hears about it
//!    ([`LifecycleObserver`], [`SessionFailure`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← observes lifecycle transitions, calls logout
//!     ↕
//! Session Layer (this crate)  ← decides what happens next
//!     ↕
//! Transport Layer (below)  ← opens connections, raises events
//! ```

mod config;
mod dispatch;
mod error;
mod machine;
mod observer;
mod state;

pub use config::{LogLevel, SessionConfig, SessionConfigBuilder};
pub use dispatch::{AttemptId, DispatchedEvent, Dispatcher, Subscription};
pub use error::{SessionError, SessionFailure};
pub use machine::ConnectionMachine;
pub use observer::{ChannelObserver, LifecycleEvent, LifecycleObserver};
pub use state::ConnectionState;
