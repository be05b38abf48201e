//! The typed facade.

use core::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use remora_core::{RpcError, Session, SubscriberId, Value};
use remora_registry::{ApiRegistry, SchemaError};

/// Everything an API call can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// Rejected locally before any wire traffic.
    Schema(SchemaError),
    /// The call could not be carried out (transport, teardown, codec).
    Rpc(RpcError),
    /// The server answered with a non-nil error slot. Carries the
    /// server-supplied payload verbatim.
    Remote(Value),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(e) => write!(f, "schema error: {e}"),
            Self::Rpc(e) => write!(f, "rpc error: {e}"),
            Self::Remote(payload) => write!(f, "server error: {payload}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::Rpc(e) => Some(e),
            Self::Remote(_) => None,
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<RpcError> for ApiError {
    fn from(e: RpcError) -> Self {
        Self::Rpc(e)
    }
}

/// A connected, bootstrapped client.
///
/// Construction issues the introspection call and builds the registry;
/// afterwards every [`invoke`] is validated against it first.
///
/// [`invoke`]: Client::invoke
pub struct Client {
    session: Arc<Session>,
    registry: ApiRegistry,
}

impl Client {
    /// Spawn the session's read loop and bootstrap a client over it.
    ///
    /// The returned join handle resolves when the connection ends; its
    /// value is the read loop's verdict.
    pub async fn start(
        session: Arc<Session>,
    ) -> Result<(Self, JoinHandle<Result<(), RpcError>>), ApiError> {
        let runner = tokio::spawn(Arc::clone(&session).run());
        let client = Self::attach(session).await?;
        Ok((client, runner))
    }

    /// Bootstrap a client over a session whose read loop is already
    /// running.
    pub async fn attach(session: Arc<Session>) -> Result<Self, ApiError> {
        let reply = session.call("vim_get_api_info", vec![]).await?;
        if reply.error != Value::Nil {
            return Err(ApiError::Remote(reply.error));
        }
        let registry = ApiRegistry::from_api_info(&reply.result)?;
        debug!(
            channel_id = registry.channel_id(),
            functions = registry.len(),
            "client bootstrapped"
        );
        Ok(Self { session, registry })
    }

    /// Call a named function, validating arguments against its signature
    /// and decoding the result through its declared return type.
    ///
    /// Schema violations fail before any bytes are written. A non-nil
    /// error slot in the response surfaces as [`ApiError::Remote`].
    pub async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, ApiError> {
        let signature = self.lookup(name)?;
        signature.check_args(&args)?;
        let reply = self.session.call(name, args).await?;
        if reply.error != Value::Nil {
            return Err(ApiError::Remote(reply.error));
        }
        Ok(signature.decode_result(reply.result)?)
    }

    /// Fire-and-forget variant of [`invoke`]: same validation, but the
    /// call does not wait for (or decode) a response.
    ///
    /// [`invoke`]: Client::invoke
    pub async fn notify_invoke(&self, name: &str, args: Vec<Value>) -> Result<(), ApiError> {
        let signature = self.lookup(name)?;
        signature.check_args(&args)?;
        self.session.notify(name, args).await?;
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&remora_registry::Signature, ApiError> {
        self.registry
            .lookup(name)
            .ok_or_else(|| ApiError::Schema(SchemaError::UnknownFunction(name.to_string())))
    }

    /// Register a handler for server-pushed notifications.
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&remora_core::Notification) + Send + Sync + 'static,
    {
        self.session.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.session.unsubscribe(id)
    }

    pub fn registry(&self) -> &ApiRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Close the underlying connection, failing in-flight calls.
    pub fn close(&self) {
        self.session.close();
    }
}
