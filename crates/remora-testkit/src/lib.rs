//! remora-testkit: an in-process mock editor server.
//!
//! [`MockEditor::spawn`] starts a task speaking the server side of the
//! protocol over one end of a duplex pipe and hands back the client end.
//! The mock self-reports a small function catalogue (deliberately
//! omitting the UI family, so clients exercise the static merge), keeps
//! a one-line document as state, and records every request method it
//! sees so tests can assert on wire traffic.

#![forbid(unsafe_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use rmpv::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tracing::{debug, warn};

use remora_core::codec::{self, FrameBuffer};
use remora_core::Message;

/// Handle to a running mock server.
pub struct MockEditor {
    log: Arc<Mutex<Vec<String>>>,
}

impl MockEditor {
    /// Start the mock and return the client end of the pipe.
    pub fn spawn() -> (DuplexStream, MockEditor) {
        let (client, server) = tokio::io::duplex(16 * 1024);
        let log = Arc::new(Mutex::new(Vec::new()));
        tokio::spawn(serve(server, Arc::clone(&log)));
        (client, MockEditor { log })
    }

    /// Method names of every request received so far, in arrival order.
    pub fn seen(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

async fn serve(stream: DuplexStream, log: Arc<Mutex<Vec<String>>>) {
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut frames = FrameBuffer::new();
    let mut current_line = String::new();

    loop {
        let msg = loop {
            match frames.next_frame() {
                Ok(Some(msg)) => break msg,
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "mock editor: bad frame");
                    return;
                }
            }
            match reader.read_buf(frames.bytes_mut()).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        };

        let Message::Request { id, method, params } = msg else {
            warn!(?msg, "mock editor: ignoring non-request frame");
            continue;
        };
        debug!(id, method = %method, "mock editor: request");
        log.lock().push(method.clone());

        let mut push_after: Option<Message> = None;
        let (error, result) = match method.as_str() {
            "vim_get_api_info" => (Value::Nil, api_info()),
            "vim_strwidth" => match params.first().and_then(Value::as_str) {
                Some(s) => (Value::Nil, Value::from(s.chars().count() as u64)),
                None => remote_error("vim_strwidth expects a string"),
            },
            "vim_set_current_line" => match params.first().and_then(Value::as_str) {
                Some(s) => {
                    current_line = s.to_string();
                    (Value::Nil, Value::Nil)
                }
                None => remote_error("vim_set_current_line expects a string"),
            },
            "vim_get_current_line" => (Value::Nil, Value::from(current_line.as_str())),
            "vim_del_current_line" => {
                current_line.clear();
                (Value::Nil, Value::Nil)
            }
            "vim_get_current_buffer" => (Value::Nil, Value::Ext(0, vec![1])),
            "vim_get_buffers" => (
                Value::Nil,
                Value::Array(vec![Value::Ext(0, vec![1]), Value::Ext(0, vec![2])]),
            ),
            "vim_eval" => match params.first().and_then(Value::as_str) {
                Some("invalid") => remote_error("E15: invalid expression"),
                Some(expr) => (Value::Nil, Value::from(expr)),
                None => remote_error("vim_eval expects a string"),
            },
            "ui_attach" => {
                push_after = Some(Message::Notification {
                    method: "redraw".to_string(),
                    params: vec![],
                });
                (Value::Nil, Value::Nil)
            }
            "ui_detach" | "ui_try_resize" => (Value::Nil, Value::Nil),
            other => remote_error(&format!("unknown method {other}")),
        };

        if write_msg(&mut writer, &Message::Response { id, error, result })
            .await
            .is_err()
        {
            return;
        }
        if let Some(note) = push_after {
            if write_msg(&mut writer, &note).await.is_err() {
                return;
            }
        }
    }
}

fn remote_error(msg: &str) -> (Value, Value) {
    (
        Value::Array(vec![Value::from(0), Value::from(msg)]),
        Value::Nil,
    )
}

async fn write_msg(
    writer: &mut (impl AsyncWriteExt + Unpin),
    msg: &Message,
) -> std::io::Result<()> {
    let bytes = codec::encode(msg)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    writer.write_all(&bytes).await
}

/// The `[channel_id, metadata]` bootstrap payload.
///
/// The UI family is intentionally absent, matching servers whose
/// catalogue omits it.
fn api_info() -> Value {
    let functions = vec![
        descriptor("vim_strwidth", &[("String", "str")], "Integer", false),
        descriptor("vim_set_current_line", &[("String", "line")], "void", true),
        descriptor("vim_get_current_line", &[], "String", true),
        descriptor("vim_del_current_line", &[], "void", true),
        descriptor("vim_get_current_buffer", &[], "Buffer", false),
        descriptor("vim_get_buffers", &[], "ArrayOf(Buffer)", false),
        descriptor("vim_eval", &[("String", "expr")], "Object", true),
    ];
    Value::Array(vec![
        Value::from(1),
        Value::Map(vec![(
            Value::from("functions"),
            Value::Array(functions),
        )]),
    ])
}

fn descriptor(name: &str, params: &[(&str, &str)], ret: &str, can_fail: bool) -> Value {
    let params: Vec<Value> = params
        .iter()
        .map(|(ty, pname)| Value::Array(vec![Value::from(*ty), Value::from(*pname)]))
        .collect();
    Value::Map(vec![
        (Value::from("name"), Value::from(name)),
        (Value::from("parameters"), Value::Array(params)),
        (Value::from("return_type"), Value::from(ret)),
        (Value::from("can_fail"), Value::from(can_fail)),
    ])
}
