//! The correlation engine.
//!
//! A [`Session`] owns one duplex byte stream. Writers share the outgoing
//! half behind an async mutex; a single read loop ([`Session::run`])
//! demultiplexes the incoming half, routing responses to the pending call
//! table and notifications to an ordered dispatch worker.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, error, trace, warn};

use crate::codec::{self, FrameBuffer};
use crate::{Message, Notification, ProtocolError, Reply, RpcError, TransportError};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type Handler = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Opaque token identifying one notification subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// A live RPC connection over one byte stream.
///
/// Any number of tasks may issue [`call`]s concurrently; each call is
/// assigned a fresh id and parked in the pending table until the read loop
/// routes its response back. Exactly one task drives [`run`].
///
/// [`call`]: Session::call
/// [`run`]: Session::run
pub struct Session {
    writer: tokio::sync::Mutex<BoxedWriter>,
    // Taken once by run(); a second run() call finds it empty.
    reader: Mutex<Option<BoxedReader>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    subscribers: Arc<Mutex<Vec<(SubscriberId, Handler)>>>,
    // Dropped on teardown so the dispatch worker drains and exits.
    notif_tx: Mutex<Option<mpsc::UnboundedSender<Notification>>>,
    notif_rx: Mutex<Option<mpsc::UnboundedReceiver<Notification>>>,
    next_msg_id: AtomicU64,
    next_subscriber_id: AtomicU64,
    closed: AtomicBool,
    shutdown: Notify,
}

impl Session {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (notif_tx, notif_rx) = mpsc::unbounded_channel();
        Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            reader: Mutex::new(Some(Box::new(reader))),
            pending: Mutex::new(HashMap::new()),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            notif_tx: Mutex::new(Some(notif_tx)),
            notif_rx: Mutex::new(Some(notif_rx)),
            next_msg_id: AtomicU64::new(0),
            next_subscriber_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Issue a request and wait for its response.
    ///
    /// The returned [`Reply`] is the raw `(error, result)` pair; callers
    /// decide what a non-nil error slot means. If the connection closes
    /// while the call is in flight, the call fails with
    /// [`RpcError::ConnectionClosed`]. Dropping the returned future
    /// withdraws the pending entry, so a late response for it is treated
    /// as orphaned.
    pub async fn call(
        &self,
        method: impl Into<String>,
        params: Vec<crate::Value>,
    ) -> Result<Reply, RpcError> {
        let method = method.into();
        let id = self.next_msg_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.register_pending(id)?;
        let _guard = PendingGuard { session: self, id };

        trace!(id, method = %method, "sending request");
        self.write_frame(&Message::Request { id, method, params })
            .await?;

        match rx.await {
            Ok(reply) => Ok(reply),
            // The sender was dropped by teardown.
            Err(_) => Err(RpcError::ConnectionClosed),
        }
    }

    /// Send a fire-and-forget request.
    ///
    /// The frame is request-shaped and carries a fresh id, but no pending
    /// entry is created: whatever response the peer eventually sends is
    /// dropped by the read loop as an orphan.
    pub async fn notify(
        &self,
        method: impl Into<String>,
        params: Vec<crate::Value>,
    ) -> Result<(), RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::ConnectionClosed);
        }
        let method = method.into();
        let id = self.next_msg_id.fetch_add(1, Ordering::Relaxed);
        trace!(id, method = %method, "sending fire-and-forget request");
        self.write_frame(&Message::Request { id, method, params })
            .await
    }

    /// Register a handler for server-pushed notifications.
    ///
    /// Handlers run on a dedicated dispatch task in arrival order. A
    /// panicking handler is logged and does not affect other handlers or
    /// the connection.
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_subscriber_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription. Returns false if the id was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subs = self.subscribers.lock();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    /// Tear the connection down locally.
    ///
    /// Every in-flight call fails with [`RpcError::ConnectionClosed`], new
    /// calls are refused, and the read loop is woken to exit.
    pub fn close(&self) {
        self.teardown();
        self.shutdown.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Ids of calls currently awaiting a response.
    pub fn pending_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.pending.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drive the read loop until the connection ends.
    ///
    /// Returns `Ok(())` on local [`close`] or peer EOF, and an error when
    /// the transport fails or the byte stream stops parsing as msgpack.
    /// In every case the pending table is drained before returning.
    ///
    /// [`close`]: Session::close
    pub async fn run(self: Arc<Self>) -> Result<(), RpcError> {
        let Some(mut reader) = self.reader.lock().take() else {
            warn!("read loop started twice");
            return Err(RpcError::Transport(TransportError::Closed));
        };

        if let Some(rx) = self.notif_rx.lock().take() {
            let subscribers = Arc::clone(&self.subscribers);
            tokio::spawn(dispatch_worker(rx, subscribers));
        }

        let mut frames = FrameBuffer::new();
        let result = loop {
            if let Err(e) = self.drain_frames(&mut frames) {
                error!(error = %e, "byte stream is unrecoverable");
                break Err(e);
            }
            tokio::select! {
                _ = self.shutdown.notified() => {
                    debug!("read loop stopped by local close");
                    break Ok(());
                }
                read = reader.read_buf(frames.bytes_mut()) => match read {
                    Ok(0) => {
                        debug!("peer closed the stream");
                        break Ok(());
                    }
                    Ok(n) => trace!(bytes = n, "read from transport"),
                    Err(e) => break Err(RpcError::Transport(TransportError::Io(e))),
                },
            }
        };
        self.teardown();
        result
    }

    /// Consume every complete frame currently buffered.
    ///
    /// Malformed frames and unknown tags are logged and skipped; only a
    /// corrupt byte stream aborts.
    fn drain_frames(&self, frames: &mut FrameBuffer) -> Result<(), RpcError> {
        loop {
            match frames.next_frame() {
                Ok(Some(msg)) => self.handle_frame(msg),
                Ok(None) => return Ok(()),
                Err(e @ ProtocolError::Corrupt(_)) => return Err(e.into()),
                Err(e) => warn!(error = %e, "discarding invalid frame"),
            }
        }
    }

    fn handle_frame(&self, msg: Message) {
        match msg {
            Message::Response { id, error, result } => {
                let tx = self.pending.lock().remove(&id);
                match tx {
                    Some(tx) => {
                        if tx.send(Reply { error, result }).is_err() {
                            debug!(id, "caller gone before its response arrived");
                        }
                    }
                    None => {
                        warn!(error = %ProtocolError::OrphanResponse { id }, "dropping frame");
                    }
                }
            }
            Message::Notification { method, params } => {
                let note = Notification { method, params };
                if let Some(tx) = self.notif_tx.lock().as_ref() {
                    let _ = tx.send(note);
                }
            }
            Message::Request { id, ref method, .. } => {
                warn!(
                    error = %ProtocolError::UnexpectedRequest { id },
                    method = %method,
                    "dropping frame"
                );
            }
        }
    }

    async fn write_frame(&self, msg: &Message) -> Result<(), RpcError> {
        let bytes = codec::encode(msg)?;
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&bytes)
            .await
            .map_err(TransportError::Io)?;
        writer.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    fn register_pending(&self, id: u64) -> Result<oneshot::Receiver<Reply>, RpcError> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock();
        // Checked under the pending lock so teardown cannot slip between
        // the check and the insert and strand this entry.
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::ConnectionClosed);
        }
        pending.insert(id, tx);
        Ok(rx)
    }

    fn teardown(&self) {
        let drained: Vec<(u64, oneshot::Sender<Reply>)> = {
            let mut pending = self.pending.lock();
            self.closed.store(true, Ordering::SeqCst);
            pending.drain().collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "failing in-flight calls on teardown");
        }
        // Dropping the senders completes every receiver with an error.
        drop(drained);
        // Dropping the sender lets the dispatch worker drain and exit.
        *self.notif_tx.lock() = None;
    }
}

/// Invokes subscribers in arrival order, one notification at a time.
async fn dispatch_worker(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    subscribers: Arc<Mutex<Vec<(SubscriberId, Handler)>>>,
) {
    while let Some(note) = rx.recv().await {
        // Snapshot so user handlers never run under the lock.
        let handlers: Vec<Handler> = subscribers
            .lock()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler(&note))).is_err() {
                error!(method = %note.method, "notification handler panicked");
            }
        }
    }
}

/// Removes the pending entry when a caller gives up before its response
/// arrives (future dropped, write failed). Routing a response removes the
/// entry first, making the drop a no-op.
struct PendingGuard<'a> {
    session: &'a Session,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.session.pending.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn idle_session() -> Session {
        let (client, server) = tokio::io::duplex(64);
        // Keep the peer end alive so writes don't fail with BrokenPipe.
        std::mem::forget(server);
        let (r, w) = tokio::io::split(client);
        Session::new(r, w)
    }

    #[test]
    fn subscribe_unsubscribe_bookkeeping() {
        let session = idle_session();
        let a = session.subscribe(|_| {});
        let b = session.subscribe(|_| {});
        assert_ne!(a, b);
        assert!(session.unsubscribe(a));
        assert!(!session.unsubscribe(a));
        assert!(session.unsubscribe(b));
    }

    #[tokio::test]
    async fn call_after_close_is_refused() {
        let session = idle_session();
        session.close();
        assert!(session.is_closed());
        let err = session.call("vim_strwidth", vec![Value::from("x")]).await;
        assert!(matches!(err, Err(RpcError::ConnectionClosed)));
        assert!(session.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn notify_after_close_is_refused() {
        let session = idle_session();
        session.close();
        let err = session.notify("ui_detach", vec![]).await;
        assert!(matches!(err, Err(RpcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn dropped_call_withdraws_its_pending_entry() {
        let session = Arc::new(idle_session());
        // Box::pin so that `drop(fut)` really drops the future;
        // `tokio::pin!` would only drop a `Pin<&mut _>` reborrow.
        let mut fut = Box::pin(session.call("vim_eval", vec![Value::from("1")]));
        // Poll once so the request is registered and written.
        futures::future::poll_immediate(fut.as_mut()).await;
        assert_eq!(session.pending_ids().len(), 1);
        drop(fut);
        assert!(session.pending_ids().is_empty());
    }
}
