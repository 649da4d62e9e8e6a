//! Custom JSON-RPC method registry.
//!
//! The Python-style "annotate a coroutine with its method name" contract
//! becomes compile-time registration here: an agent registers typed async
//! handlers under method names, the parameter schema is the handler's
//! `Deserialize` parameter type, and the result schema is its `Serialize`
//! return type. Coercion failures surface as invalid-params errors
//! (-32602) without invoking the handler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};

use super::task_store::TaskStore;

/// Type-erased handler: JSON params in, JSON result out.
type BoxedHandler = Box<
    dyn Fn(serde_json::Value, Arc<dyn TaskStore>) -> BoxFuture<'static, A2AResult<serde_json::Value>>
        + Send
        + Sync,
>;

/// Dispatch table for user-registered JSON-RPC methods.
///
/// Populated by [`crate::server::A2aAgent::register_methods`] at router
/// construction; lookups at dispatch time are a plain map probe.
///
/// # Example
///
/// ```
/// use agentvault::server::MethodRegistry;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize)]
/// struct EchoParams {
///     text: String,
/// }
///
/// #[derive(Serialize)]
/// struct EchoResult {
///     echo: String,
/// }
///
/// let mut registry = MethodRegistry::new();
/// registry.register("custom/echo", |params: EchoParams| async move {
///     Ok(EchoResult { echo: params.text })
/// });
/// assert!(registry.contains("custom/echo"));
/// ```
#[derive(Default)]
pub struct MethodRegistry {
    handlers: HashMap<String, BoxedHandler>,
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MethodRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that only needs its parameters.
    ///
    /// Registering a name twice overwrites the previous handler with a
    /// warning, matching the duplicate-annotation rule.
    pub fn register<P, R, F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = A2AResult<R>> + Send + 'static,
    {
        self.register_with_store(method, move |params: P, _store| handler(params));
    }

    /// Register a handler that also receives the server's task store.
    pub fn register_with_store<P, R, F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
        F: Fn(P, Arc<dyn TaskStore>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = A2AResult<R>> + Send + 'static,
    {
        let method = method.into();
        let boxed: BoxedHandler = Box::new(
            move |params: serde_json::Value,
                  store: Arc<dyn TaskStore>|
                  -> BoxFuture<'static, A2AResult<serde_json::Value>> {
                // Coerce params into the handler's declared parameter type
                // before invoking; failures never reach the handler.
                match serde_json::from_value::<P>(params) {
                    Ok(params) => {
                        let fut = handler(params, store);
                        Box::pin(async move {
                            let result = fut.await?;
                            serde_json::to_value(result).map_err(|e| {
                                A2AError::internal(format!(
                                    "failed to serialize handler result: {e}"
                                ))
                            })
                        })
                    }
                    Err(e) => Box::pin(async move {
                        Err(A2AError::invalid_params(format!("invalid parameters: {e}")))
                    }),
                }
            },
        );

        if self.handlers.insert(method.clone(), boxed).is_some() {
            warn!(method = %method, "duplicate method registration, overwriting previous handler");
        } else {
            debug!(method = %method, "registered custom JSON-RPC method");
        }
    }

    /// Whether a handler is registered for `method`.
    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke a registered handler. Returns `None` when the method is not
    /// registered.
    pub(crate) async fn dispatch(
        &self,
        method: &str,
        params: serde_json::Value,
        store: Arc<dyn TaskStore>,
    ) -> Option<A2AResult<serde_json::Value>> {
        let handler = self.handlers.get(method)?;
        Some(handler(params, store).await)
    }
}
