//! Wire message types.
//!
//! The protocol has exactly three frame shapes, distinguished by a small
//! integer tag at the head of a msgpack array:
//!
//! - `[0, id, method, params]` — request
//! - `[1, id, error, result]` — response
//! - `[2, method, params]` — notification

use rmpv::Value;

/// Tag for a request frame.
pub const TAG_REQUEST: i64 = 0;
/// Tag for a response frame.
pub const TAG_RESPONSE: i64 = 1;
/// Tag for a notification frame.
pub const TAG_NOTIFICATION: i64 = 2;

/// One complete protocol frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A named call carrying a correlation id. The peer answers with a
    /// `Response` bearing the same id.
    Request {
        id: u64,
        method: String,
        params: Vec<Value>,
    },
    /// Answer to a request. Exactly one of `error`/`result` is meaningful;
    /// the other is nil.
    Response {
        id: u64,
        error: Value,
        result: Value,
    },
    /// Server-pushed event. Carries no id; no reply is expected.
    Notification { method: String, params: Vec<Value> },
}

/// The `(error, result)` pair a pending call is completed with.
///
/// The correlation engine hands this back raw; interpreting a non-nil
/// `error` is the facade's job.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub error: Value,
    pub result: Value,
}

/// A server-pushed notification as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Vec<Value>,
}
