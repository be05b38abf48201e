//! remora-core: Core types and the correlation engine for the remora
//! msgpack-RPC client.
//!
//! This crate defines:
//! - Wire messages ([`Message`], [`Reply`], [`Notification`])
//! - The resumable frame codec ([`codec`], [`FrameBuffer`])
//! - The correlation engine ([`Session`])
//! - Error types ([`TransportError`], [`ProtocolError`], [`RpcError`])
//!
//! It knows nothing about the editor's API surface; that lives in
//! `remora-registry` and the `remora` facade crate.

#![forbid(unsafe_code)]

pub mod codec;
mod error;
mod message;
mod session;

pub use codec::FrameBuffer;
pub use error::*;
pub use message::*;
pub use session::*;

/// Re-export of the dynamic msgpack value type used throughout the wire API.
pub use rmpv::Value;
