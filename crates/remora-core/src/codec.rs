//! Resumable frame codec.
//!
//! Frames are plain msgpack arrays with no outer length prefix, so a frame
//! boundary is only known once a complete value has been parsed. The codec
//! therefore performs no I/O of its own: callers accumulate bytes and retry.
//! [`decode`] reports `Ok(None)` when the buffer holds only a partial frame,
//! and the number of bytes consumed when it holds a full one. [`FrameBuffer`]
//! wraps this for the read loop, retaining unconsumed trailing bytes across
//! reads instead of dropping them.

use bytes::{Buf, BytesMut};
use rmpv::Value;

use crate::error::value_kind;
use crate::{
    Message, ProtocolError, TAG_NOTIFICATION, TAG_REQUEST, TAG_RESPONSE,
};

/// Encode one message to its wire bytes.
pub fn encode(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let value = match msg {
        Message::Request { id, method, params } => Value::Array(vec![
            Value::from(TAG_REQUEST),
            Value::from(*id),
            Value::from(method.as_str()),
            Value::Array(params.clone()),
        ]),
        Message::Response { id, error, result } => Value::Array(vec![
            Value::from(TAG_RESPONSE),
            Value::from(*id),
            error.clone(),
            result.clone(),
        ]),
        Message::Notification { method, params } => Value::Array(vec![
            Value::from(TAG_NOTIFICATION),
            Value::from(method.as_str()),
            Value::Array(params.clone()),
        ]),
    };

    let mut bytes = Vec::new();
    rmpv::encode::write_value(&mut bytes, &value)
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Decode one message from the front of `buf`.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete frame
/// (the caller must append more bytes and retry), or the message together
/// with the exact number of bytes it occupied.
pub fn decode(buf: &[u8]) -> Result<Option<(Message, usize)>, ProtocolError> {
    match decode_value(buf)? {
        Some((value, consumed)) => Ok(Some((message_from_value(value)?, consumed))),
        None => Ok(None),
    }
}

/// Decode one complete msgpack value from the front of `buf`, reporting how
/// many bytes it occupied. `Ok(None)` means the value is truncated.
pub fn decode_value(buf: &[u8]) -> Result<Option<(Value, usize)>, ProtocolError> {
    let mut rd = buf;
    match rmpv::decode::read_value(&mut rd) {
        Ok(value) => Ok(Some((value, buf.len() - rd.len()))),
        // A truncated read surfaces as UnexpectedEof from the underlying
        // reader; anything else means the stream itself is not msgpack.
        Err(rmpv::decode::Error::InvalidMarkerRead(ref io))
        | Err(rmpv::decode::Error::InvalidDataRead(ref io))
            if io.kind() == std::io::ErrorKind::UnexpectedEof =>
        {
            Ok(None)
        }
        Err(e) => Err(ProtocolError::Corrupt(e.to_string())),
    }
}

/// Interpret a decoded msgpack value as a protocol message.
pub fn message_from_value(value: Value) -> Result<Message, ProtocolError> {
    let Value::Array(items) = value else {
        return Err(ProtocolError::Malformed(format!(
            "expected array frame, got {}",
            value_kind(&value)
        )));
    };

    let mut items = items.into_iter();
    let tag = items
        .next()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ProtocolError::Malformed("missing integer tag".into()))?;

    match tag {
        TAG_REQUEST => {
            let id = take_id(&mut items)?;
            let method = take_method(&mut items)?;
            let params = take_params(&mut items)?;
            Ok(Message::Request { id, method, params })
        }
        TAG_RESPONSE => {
            let id = take_id(&mut items)?;
            let error = items
                .next()
                .ok_or_else(|| ProtocolError::Malformed("response missing error".into()))?;
            let result = items
                .next()
                .ok_or_else(|| ProtocolError::Malformed("response missing result".into()))?;
            Ok(Message::Response { id, error, result })
        }
        TAG_NOTIFICATION => {
            let method = take_method(&mut items)?;
            let params = take_params(&mut items)?;
            Ok(Message::Notification { method, params })
        }
        other => Err(ProtocolError::UnexpectedTag(other)),
    }
}

fn take_id(items: &mut std::vec::IntoIter<Value>) -> Result<u64, ProtocolError> {
    items
        .next()
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ProtocolError::Malformed("missing non-negative integer id".into()))
}

fn take_method(items: &mut std::vec::IntoIter<Value>) -> Result<String, ProtocolError> {
    match items.next() {
        Some(Value::String(s)) => s
            .into_str()
            .ok_or_else(|| ProtocolError::Malformed("method name is not UTF-8".into())),
        Some(other) => Err(ProtocolError::Malformed(format!(
            "method name must be a string, got {}",
            value_kind(&other)
        ))),
        None => Err(ProtocolError::Malformed("missing method name".into())),
    }
}

fn take_params(items: &mut std::vec::IntoIter<Value>) -> Result<Vec<Value>, ProtocolError> {
    match items.next() {
        Some(Value::Array(params)) => Ok(params),
        Some(other) => Err(ProtocolError::Malformed(format!(
            "params must be an array, got {}",
            value_kind(&other)
        ))),
        None => Err(ProtocolError::Malformed("missing params".into())),
    }
}

/// Accumulating decode buffer for the read loop.
///
/// Bytes are appended as they arrive from the transport; [`next_frame`]
/// drains complete frames and keeps whatever remains for the next read.
///
/// [`next_frame`]: FrameBuffer::next_frame
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes read from the transport.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// The underlying buffer, for reading into directly.
    pub fn bytes_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Number of buffered, not-yet-consumed bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Pop the next complete frame, if one is buffered.
    ///
    /// `Ok(None)` means more bytes are needed. A [`ProtocolError::Malformed`]
    /// or [`ProtocolError::UnexpectedTag`] error refers to a frame that has
    /// already been consumed from the buffer; the caller may log it and call
    /// again. [`ProtocolError::Corrupt`] leaves the buffer untouched and is
    /// unrecoverable.
    pub fn next_frame(&mut self) -> Result<Option<Message>, ProtocolError> {
        let Some((value, consumed)) = decode_value(&self.buf)? else {
            return Ok(None);
        };
        self.buf.advance(consumed);
        message_from_value(value).map(Some)
    }
}
