//! Server-side implementation of the AgentVault A2A protocol.
//!
//! - [`A2aAgent`] — the handler trait an agent implements (built-in
//!   protocol methods have store-backed defaults)
//! - [`MethodRegistry`] — typed registration of custom JSON-RPC methods
//! - [`a2a_router`] — axum integration (dispatch + SSE emission)
//! - [`TaskStore`] / [`InMemoryTaskStore`] — task state and event fan-out

mod agent;
mod registry;
mod router;
mod task_store;

pub use agent::A2aAgent;
pub use registry::MethodRegistry;
pub use router::a2a_router;
pub use task_store::{InMemoryTaskStore, TaskEventStream, TaskStore};
