//! Client-side implementation of the AgentVault A2A protocol.
//!
//! - [`A2AClient`] — task lifecycle RPCs (`tasks/send`, `tasks/get`,
//!   `tasks/cancel`) and SSE subscription (`tasks/sendSubscribe`)
//! - [`EventStream`] — lazy single-consumer stream of task events

mod a2a_client;
mod auth;
mod sse;

pub use a2a_client::{A2AClient, DEFAULT_TIMEOUT_SECS};
pub use sse::EventStream;
