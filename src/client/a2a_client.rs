//! High-level client for interacting with remote A2A agents.
//!
//! [`A2AClient`] drives the task lifecycle over JSON-RPC 2.0: initiating
//! tasks, sending follow-up messages, polling status, requesting
//! cancellation, and subscribing to the SSE event stream. Authentication
//! is negotiated per call from the agent card against a [`KeyManager`].

use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::key_manager::KeyManager;
use crate::mcp::inject_mcp_context;
use crate::types::{
    AgentCard, JsonRpcRequest, JsonRpcResponse, Message, Task, TaskCancelParams, TaskCancelResult,
    TaskGetParams, TaskSendParams, TaskSendResult, TaskSubscribeParams,
};

use super::auth::{auth_headers, TokenCache};
use super::sse::EventStream;

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the AgentVault A2A protocol.
///
/// One client instance owns an HTTP connection pool (or borrows one
/// injected by the caller) and a per-instance OAuth token cache. All
/// methods take the target's [`AgentCard`] and a [`KeyManager`] for
/// credential resolution, so one client can talk to many agents.
///
/// # Construction
///
/// ```no_run
/// use std::time::Duration;
/// use agentvault::client::A2AClient;
///
/// // Internally managed HTTP client, default 30s timeout:
/// let client = A2AClient::new();
///
/// // Custom timeout:
/// let client = A2AClient::with_timeout(Duration::from_secs(10));
///
/// // Caller-managed reqwest client (shared connection pool):
/// let http = reqwest::Client::new();
/// let client = A2AClient::with_http_client(http);
/// ```
pub struct A2AClient {
    http: reqwest::Client,
    /// Whether this instance created `http`. Fixed at construction: an
    /// injected client's lifecycle stays with the caller.
    owns_http: bool,
    default_timeout: Duration,
    token_cache: TokenCache,
}

impl std::fmt::Debug for A2AClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("A2AClient")
            .field("owns_http", &self.owns_http)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl A2AClient {
    /// Create a client with an internally managed HTTP pool and the
    /// default 30 second per-call timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an internally managed HTTP pool and a custom
    /// per-call timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            owns_http: true,
            default_timeout: timeout,
            token_cache: TokenCache::new(),
        }
    }

    /// Create a client around a caller-managed `reqwest::Client`.
    ///
    /// The injected client (and its connection pool) is never torn down by
    /// this instance; the caller keeps control of its lifecycle.
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self {
            http,
            owns_http: false,
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_cache: TokenCache::new(),
        }
    }

    /// Set the per-call timeout (builder-style).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Whether this instance owns its HTTP pool (as opposed to borrowing
    /// an injected one).
    pub fn owns_http_client(&self) -> bool {
        self.owns_http
    }

    // ──────────────────────────────────────────────────
    // Task lifecycle methods
    // ──────────────────────────────────────────────────

    /// Start a new task on the agent by sending the first message
    /// (`tasks/send` with a null id). Returns the server-assigned task id.
    ///
    /// When `mcp_context` is non-empty it is embedded into the message
    /// metadata under `mcp_context` before sending; formatting failures
    /// degrade to sending without it.
    pub async fn initiate_task(
        &self,
        card: &AgentCard,
        message: Message,
        keys: &KeyManager,
        mcp_context: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> A2AResult<String> {
        info!(agent = %card.human_readable_id, "initiating task");
        let message = prepare_message(message, mcp_context);
        let params = TaskSendParams { id: None, message };
        let request = build_request("tasks/send", &params, "init")?;

        let result: TaskSendResult = self.call(card, keys, &request).await?;
        if result.id.is_empty() {
            return Err(A2AError::Message(
                "invalid response: 'result.id' is empty".to_string(),
            ));
        }
        info!(agent = %card.human_readable_id, task_id = %result.id, "task initiated");
        Ok(result.id)
    }

    /// Send a follow-up message to an existing task (`tasks/send`).
    /// Returns `true` once the server has acknowledged the message.
    pub async fn send_message(
        &self,
        card: &AgentCard,
        task_id: &str,
        message: Message,
        keys: &KeyManager,
        mcp_context: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> A2AResult<bool> {
        info!(agent = %card.human_readable_id, task_id = %task_id, "sending message");
        let message = prepare_message(message, mcp_context);
        let params = TaskSendParams {
            id: Some(task_id.to_string()),
            message,
        };
        let request = build_request("tasks/send", &params, "send")?;

        let _: TaskSendResult = self.call(card, keys, &request).await?;
        Ok(true)
    }

    /// Retrieve the current snapshot of a task, including its history and
    /// artifacts (`tasks/get`).
    pub async fn get_task_status(
        &self,
        card: &AgentCard,
        task_id: &str,
        keys: &KeyManager,
    ) -> A2AResult<Task> {
        debug!(agent = %card.human_readable_id, task_id = %task_id, "getting task status");
        let params = TaskGetParams {
            id: task_id.to_string(),
        };
        let request = build_request("tasks/get", &params, "get")?;
        self.call(card, keys, &request).await
    }

    /// Request cancellation of a task (`tasks/cancel`). Returns `true`
    /// once the server has acknowledged the request — including when the
    /// task could no longer be canceled (`success: false`), which is
    /// logged as a warning.
    pub async fn terminate_task(
        &self,
        card: &AgentCard,
        task_id: &str,
        keys: &KeyManager,
    ) -> A2AResult<bool> {
        info!(agent = %card.human_readable_id, task_id = %task_id, "requesting task termination");
        let params = TaskCancelParams {
            id: task_id.to_string(),
        };
        let request = build_request("tasks/cancel", &params, "cancel")?;

        let result: TaskCancelResult = self.call(card, keys, &request).await?;
        if !result.success {
            tracing::warn!(
                task_id = %task_id,
                message = result.message.as_deref().unwrap_or(""),
                "agent acknowledged termination request but indicated failure"
            );
        }
        Ok(true)
    }

    /// Subscribe to a task's event stream (`tasks/sendSubscribe`).
    ///
    /// Returns a lazy, finite [`EventStream`] that is consumed exactly
    /// once and cannot be restarted. Per-event validation failures are
    /// dropped with a warning; transport failures end the stream with
    /// [`A2AError::Connection`].
    pub async fn receive_messages(
        &self,
        card: &AgentCard,
        task_id: &str,
        keys: &KeyManager,
    ) -> A2AResult<EventStream> {
        info!(agent = %card.human_readable_id, task_id = %task_id, "subscribing to task events");
        let params = TaskSubscribeParams {
            id: task_id.to_string(),
        };
        let request = build_request("tasks/sendSubscribe", &params, "sub")?;

        let headers = auth_headers(
            &self.http,
            self.default_timeout,
            &self.token_cache,
            card,
            keys,
        )
        .await?;

        let response = self
            .http
            .post(&card.url)
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(A2AError::RemoteAgent {
                code: i64::from(status.as_u16()),
                message: format!("HTTP error {status} for {}", card.url),
                data: body_as_data(body),
            });
        }

        Ok(EventStream::from_response(response))
    }

    // ──────────────────────────────────────────────────
    // Internals
    // ──────────────────────────────────────────────────

    /// Send one JSON-RPC request and decode the typed result, mapping all
    /// failure modes into the closed error taxonomy.
    async fn call<T: DeserializeOwned>(
        &self,
        card: &AgentCard,
        keys: &KeyManager,
        request: &JsonRpcRequest,
    ) -> A2AResult<T> {
        let headers = auth_headers(
            &self.http,
            self.default_timeout,
            &self.token_cache,
            card,
            keys,
        )
        .await?;

        let response = self.post_rpc(&card.url, headers, request).await?;

        if let Some(error) = response.error {
            debug!(code = error.code, "agent returned JSON-RPC error");
            return Err(A2AError::RemoteAgent {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        let result = response.result.ok_or_else(|| {
            A2AError::Message("invalid JSON-RPC response: missing 'result' and 'error'".to_string())
        })?;
        serde_json::from_value(result)
            .map_err(|e| A2AError::Message(format!("failed to validate result structure: {e}")))
    }

    async fn post_rpc(
        &self,
        url: &str,
        headers: HeaderMap,
        request: &JsonRpcRequest,
    ) -> A2AResult<JsonRpcResponse> {
        let response = self
            .http
            .post(url)
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .timeout(self.default_timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(A2AError::RemoteAgent {
                code: i64::from(status.as_u16()),
                message: format!("HTTP error {status} for {url}"),
                data: body_as_data(body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| A2AError::Connection(format!("failed to read response body: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| A2AError::Message(format!("failed to decode JSON-RPC response: {e}")))
    }
}

impl Default for A2AClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Embed optional MCP context into the outgoing message.
fn prepare_message(
    mut message: Message,
    mcp_context: Option<&serde_json::Map<String, serde_json::Value>>,
) -> Message {
    if let Some(context) = mcp_context.filter(|c| !c.is_empty()) {
        inject_mcp_context(&mut message, context);
    }
    message
}

/// Build a request envelope with a unique per-call id (`req-<op>-<uuid>`).
fn build_request(
    method: &str,
    params: &impl serde::Serialize,
    op: &str,
) -> A2AResult<JsonRpcRequest> {
    let params = serde_json::to_value(params)
        .map_err(|e| A2AError::Message(format!("failed to serialize request params: {e}")))?;
    let id = serde_json::Value::String(format!("req-{op}-{}", Uuid::new_v4()));
    Ok(JsonRpcRequest::new(method, params, id))
}

fn map_transport_error(e: reqwest::Error) -> A2AError {
    if e.is_timeout() {
        A2AError::Timeout(format!("request timed out: {e}"))
    } else if e.is_connect() {
        A2AError::Connection(format!("connection failed: {e}"))
    } else {
        A2AError::Connection(format!("HTTP request failed: {e}"))
    }
}

/// Keep a failed response body as structured error data when possible.
fn body_as_data(body: String) -> Option<serde_json::Value> {
    if body.is_empty() {
        None
    } else {
        Some(serde_json::Value::String(body))
    }
}
