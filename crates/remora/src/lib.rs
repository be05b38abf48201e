//! remora: a msgpack-RPC client for editor-like servers.
//!
//! The [`Client`] facade validates calls against the server's
//! self-reported function catalogue before any bytes hit the wire, and
//! decodes results back through the declared return types. The lower
//! layers are available directly: the correlation engine lives in
//! [`remora_core`] and the registry in [`remora_registry`].
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use remora::{connect, Client, Value};
//!
//! let (session, _child) = connect::spawn_editor("nvim").await?;
//! let (client, _runner) = Client::start(session).await?;
//! let width = client.invoke("vim_strwidth", vec![Value::from("hello")]).await?;
//! assert_eq!(width, Value::from(5));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod client;
pub mod connect;

pub use client::{ApiError, Client};
pub use remora_core::{
    Notification, ProtocolError, Reply, RpcError, Session, SubscriberId, TransportError, Value,
};
pub use remora_registry::{ApiRegistry, HandleKind, Param, SchemaError, Signature, WireType};
