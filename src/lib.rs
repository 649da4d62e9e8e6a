//! # agentvault — AgentVault Agent-to-Agent (A2A) protocol for Rust
//!
//! Bidirectional JSON-RPC 2.0 client and server for managing long-running
//! tasks on remote agents, with Server-Sent Events (SSE) streaming of
//! asynchronous task updates and layered credential resolution.
//!
//! ## Overview
//!
//! The A2A protocol lets agents:
//! - initiate tasks and send follow-up messages (`tasks/send`)
//! - poll task state, history, and artifacts (`tasks/get`)
//! - request cancellation (`tasks/cancel`)
//! - stream status / message / artifact updates in real time
//!   (`tasks/sendSubscribe`)
//!
//! This crate provides:
//! - [`client::A2AClient`] — typed client with per-card auth negotiation
//!   (API key, OAuth2 client-credentials with token caching, or none)
//! - [`server::A2aAgent`] + [`server::a2a_router`] — agent trait and axum
//!   integration with JSON-RPC dispatch and SSE emission
//! - [`KeyManager`] — credential resolution from key files, environment
//!   variables, and the OS keyring
//! - [`server::TaskStore`] / [`server::InMemoryTaskStore`] — pluggable
//!   task state with event fan-out
//!
//! ## Feature flags
//!
//! | Feature      | Default | Description |
//! |--------------|---------|-------------|
//! | `client`     | yes     | HTTP client for calling A2A agents (reqwest + SSE) |
//! | `server`     | yes     | Agent trait + axum integration for serving agents |
//! | `os-keyring` | no      | OS keyring as a credential source |
//! | `full`       | no      | Everything |
//!
//! ## Quick start: client
//!
//! ```no_run
//! use agentvault::client::A2AClient;
//! use agentvault::{AgentCard, KeyManager, Message};
//!
//! # async fn example(card: AgentCard) -> Result<(), Box<dyn std::error::Error>> {
//! let client = A2AClient::new();
//! let keys = KeyManager::builder().keyring(false).build();
//!
//! // Start a task and stream its updates.
//! let task_id = client
//!     .initiate_task(&card, Message::user_text("Summarize this repo"), &keys, None)
//!     .await?;
//!
//! let mut events = client.receive_messages(&card, &task_id, &keys).await?;
//! while let Some(event) = events.next().await {
//!     match event? {
//!         agentvault::A2AEvent::Status(update) => {
//!             println!("state: {}", update.state);
//!         }
//!         agentvault::A2AEvent::Message(msg) => {
//!             println!("message: {:?}", msg.message.parts);
//!         }
//!         agentvault::A2AEvent::Artifact(update) => {
//!             println!("artifact: {}", update.artifact.id);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Quick start: server
//!
//! Implement [`server::A2aAgent`]; the built-in protocol methods have
//! store-backed defaults, so a minimal agent can start from nothing and
//! override only what it customises:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentvault::server::{A2aAgent, InMemoryTaskStore, TaskStore, a2a_router};
//! use agentvault::error::A2AResult;
//! use agentvault::{Message, TaskState};
//! use async_trait::async_trait;
//!
//! struct EchoAgent;
//!
//! #[async_trait]
//! impl A2aAgent for EchoAgent {
//!     async fn handle_task_send(
//!         &self,
//!         task_id: Option<String>,
//!         message: Message,
//!         store: &dyn TaskStore,
//!     ) -> A2AResult<String> {
//!         let task = store.create_task(message.clone()).await?;
//!         store.set_state(&task.id, TaskState::Working).await?;
//!         store
//!             .append_message(&task.id, Message::assistant_text("echo"))
//!             .await?;
//!         store.set_state(&task.id, TaskState::Completed).await?;
//!         Ok(task.id)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = a2a_router(Arc::new(EchoAgent), "/a2a", Arc::new(InMemoryTaskStore::new()));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Credential resolution
//!
//! [`KeyManager`] resolves per-service secrets with file > environment >
//! OS keyring precedence:
//!
//! ```no_run
//! use agentvault::KeyManager;
//!
//! // With AGENTVAULT_KEY_DEMO=secret-123 in the environment:
//! let keys = KeyManager::new();
//! let secret = keys.get_key("demo");
//! ```

pub mod builders;
pub mod error;
pub mod key_manager;
pub mod mcp;
pub mod types;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod server;

/// Prelude re-exporting the most commonly used types.
///
/// ```
/// use agentvault::prelude::*;
/// ```
pub mod prelude {
    pub use crate::builders::AgentCardBuilder;
    pub use crate::error::{A2AError, A2AResult};
    pub use crate::key_manager::{KeyManager, KeySource};
    pub use crate::types::{
        A2AEvent, AgentAuthentication, AgentCapabilities, AgentCard, Artifact, AuthScheme,
        Message, Role, Task, TaskArtifactUpdateEvent, TaskMessageEvent, TaskState,
        TaskStatusUpdateEvent,
    };

    #[cfg(feature = "client")]
    pub use crate::client::{A2AClient, EventStream};

    #[cfg(feature = "server")]
    pub use crate::builders::ServerBuilder;

    #[cfg(feature = "server")]
    pub use crate::server::{
        a2a_router, A2aAgent, InMemoryTaskStore, MethodRegistry, TaskEventStream, TaskStore,
    };
}

// Convenience re-exports at the crate root.
pub use builders::AgentCardBuilder;
pub use error::{A2AError, A2AResult};
pub use key_manager::{KeyManager, KeySource};
pub use types::*;

#[cfg(feature = "server")]
pub use builders::ServerBuilder;
