//! Error types.

use core::fmt;

use rmpv::Value;

/// Transport-level errors. Fatal to the connection.
#[derive(Debug)]
pub enum TransportError {
    /// The byte stream reached EOF or was closed locally.
    Closed,
    /// An I/O failure while reading or writing the stream.
    Io(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "transport closed"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Closed => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Per-frame protocol violations.
///
/// Only [`ProtocolError::Corrupt`] is fatal: a byte stream that fails to
/// parse as msgpack cannot be re-framed, since frames carry no length
/// prefix. Every other variant describes one complete frame that has
/// already been consumed; the read loop logs it and keeps going.
#[derive(Debug)]
pub enum ProtocolError {
    /// The byte stream is not valid msgpack. Unrecoverable.
    Corrupt(String),
    /// A complete msgpack value that is not a valid message shape.
    Malformed(String),
    /// A complete frame with an unknown leading tag.
    UnexpectedTag(i64),
    /// A response whose id matches no pending call. The id is orphaned.
    OrphanResponse { id: u64 },
    /// A server-initiated request, which this client does not support.
    UnexpectedRequest { id: u64 },
    /// Failure serializing an outgoing message.
    Encode(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupt(msg) => write!(f, "corrupt byte stream: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed frame: {msg}"),
            Self::UnexpectedTag(tag) => write!(f, "unexpected frame tag {tag}"),
            Self::OrphanResponse { id } => {
                write!(f, "response id {id} matches no pending call")
            }
            Self::UnexpectedRequest { id } => {
                write!(f, "server-initiated request (id {id}) is not supported")
            }
            Self::Encode(msg) => write!(f, "encode failed: {msg}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// High-level per-call errors surfaced by the correlation engine.
#[derive(Debug)]
pub enum RpcError {
    /// The underlying transport failed.
    Transport(TransportError),
    /// The connection was torn down before (or while) the call completed.
    ConnectionClosed,
    /// The outgoing message could not be encoded.
    Protocol(ProtocolError),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Protocol(e) => Some(e),
            Self::ConnectionClosed => None,
        }
    }
}

impl From<TransportError> for RpcError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ProtocolError> for RpcError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

/// Helper for error messages that quote a dynamic value's shape.
pub(crate) fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Nil => "nil",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::F32(_) | Value::F64(_) => "float",
        Value::String(_) => "string",
        Value::Binary(_) => "binary",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Ext(..) => "ext",
    }
}
