//! The agent-side handler trait.
//!
//! [`A2aAgent`] is what an agent author implements to serve the A2A
//! protocol. Every built-in method has a default implementation written
//! against the injected [`TaskStore`], so a minimal agent only overrides
//! the handlers it customises (typically `handle_task_send` to kick off
//! its own processing). Custom JSON-RPC methods are declared by
//! registering typed handlers in [`register_methods`].
//!
//! [`register_methods`]: A2aAgent::register_methods

use async_trait::async_trait;
use tracing::debug;

use crate::error::{A2AError, A2AResult};
use crate::types::{Message, Task, TaskState};

use super::registry::MethodRegistry;
use super::task_store::{TaskEventStream, TaskStore};

/// Handler set for one A2A agent.
///
/// The server routes the four built-in protocol methods to the
/// `handle_*` methods below and custom methods to the registry populated
/// by [`register_methods`](Self::register_methods). Errors returned from
/// handlers are mapped to JSON-RPC error envelopes by the router
/// ([`A2AError::TaskNotFound`] → -32001, [`A2AError::InvalidParams`] →
/// -32602, [`A2AError::Application`] → -32000, anything else → -32603).
#[async_trait]
pub trait A2aAgent: Send + Sync {
    /// Handle `tasks/send`.
    ///
    /// With no `task_id` this creates a fresh task in `SUBMITTED` state;
    /// with a `task_id` it appends the message to the existing task.
    /// Returns the task id in both cases.
    async fn handle_task_send(
        &self,
        task_id: Option<String>,
        message: Message,
        store: &dyn TaskStore,
    ) -> A2AResult<String> {
        match task_id {
            None => {
                let task = store.create_task(message).await?;
                debug!(task_id = %task.id, "created task for tasks/send");
                Ok(task.id)
            }
            Some(id) => {
                store.append_message(&id, message).await?;
                Ok(id)
            }
        }
    }

    /// Handle `tasks/get`: return the full task snapshot, including
    /// history and artifacts.
    async fn handle_task_get(&self, task_id: &str, store: &dyn TaskStore) -> A2AResult<Task> {
        store
            .get_task(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(task_id))
    }

    /// Handle `tasks/cancel`: request a transition to `CANCELED`.
    ///
    /// Returns whether the cancellation was applied; `false` (e.g. for a
    /// task that is already terminal) is a successful RPC, not an error.
    async fn handle_task_cancel(&self, task_id: &str, store: &dyn TaskStore) -> A2AResult<bool> {
        store.set_state(task_id, TaskState::Canceled).await
    }

    /// Handle `tasks/sendSubscribe`: produce the task's event stream.
    ///
    /// The default implementation forwards the store's subscription. The
    /// router has already verified the task exists, so overrides can
    /// assume a known id.
    async fn handle_subscribe(
        &self,
        task_id: &str,
        store: &dyn TaskStore,
    ) -> A2AResult<TaskEventStream> {
        store.subscribe(task_id).await
    }

    /// Declare custom JSON-RPC methods by registering typed handlers.
    ///
    /// Called once at router construction. Methods registered here are
    /// dispatched before the built-ins, so an agent can also override a
    /// built-in by registering its name.
    fn register_methods(&self, registry: &mut MethodRegistry) {
        let _ = registry;
    }
}
