//! Wire vocabulary for Zonelink.
//!
//! This crate defines what a client and a zone server say to each other
//! while a session is being established:
//!
//! - **Types** ([`ClientRequest`], [`ServerReply`], [`LoginRequest`],
//!   [`DisconnectReason`]): the frames that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those frames are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits below the transport adapters. It doesn't know
//! about sockets or connection state; it only knows how to serialize
//! and deserialize frames.
//!
//! ```text
//! Session (state machine) → Transport (adapter, events) → Protocol (frames)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    API_VERSION, ClientRequest, DisconnectReason, LoginRequest, ServerReply,
};
