//! Axum integration — the A2A JSON-RPC endpoint.
//!
//! [`a2a_router`] mounts a single POST route that parses JSON-RPC 2.0
//! envelopes, dispatches to registered custom methods and the four
//! built-in protocol methods, and streams `tasks/sendSubscribe` responses
//! as Server-Sent Events. All failures produce JSON-RPC error envelopes;
//! HTTP status is 200 except internal errors (-32603), which return 500
//! per the protocol convention.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{self, A2AError};
use crate::types::{
    JsonRpcError, JsonRpcResponse, TaskCancelParams, TaskCancelResult, TaskGetParams,
    TaskSendParams, TaskSendResult, TaskSubscribeParams,
};

use super::agent::A2aAgent;
use super::registry::MethodRegistry;
use super::task_store::{TaskEventStream, TaskStore};

/// Shared state for the A2A route.
struct AppState {
    agent: Arc<dyn A2aAgent>,
    store: Arc<dyn TaskStore>,
    methods: MethodRegistry,
}

/// Create an axum `Router` exposing the agent under `prefix`.
///
/// The route accepts `POST {prefix}` with `Content-Type:
/// application/json` (`POST /` when the prefix is empty; a non-empty
/// prefix must start with `/`). Custom methods are discovered from the
/// agent via
/// [`A2aAgent::register_methods`] at construction time and dispatched
/// before the built-ins, so agents can override built-in behavior by
/// registering the same method name.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use agentvault::server::{a2a_router, InMemoryTaskStore};
///
/// let app = a2a_router(Arc::new(MyAgent), "/a2a", Arc::new(InMemoryTaskStore::new()));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
/// axum::serve(listener, app).await?;
/// ```
pub fn a2a_router(
    agent: Arc<dyn A2aAgent>,
    prefix: &str,
    store: Arc<dyn TaskStore>,
) -> Router {
    let mut methods = MethodRegistry::new();
    agent.register_methods(&mut methods);
    debug!(
        custom_methods = methods.len(),
        prefix = %prefix,
        "building A2A router"
    );

    let state = Arc::new(AppState {
        agent,
        store,
        methods,
    });

    let path = if prefix.is_empty() { "/" } else { prefix };
    Router::new()
        .route(path, post(handle_a2a_request))
        .with_state(state)
}

/// JSON-RPC dispatch for a single POST request.
async fn handle_a2a_request(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // 1. Parse the body; failures get a parse-error envelope with null id.
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "failed to parse request body as JSON");
            return rpc_error(Value::Null, error::PARSE_ERROR, "Parse error");
        }
    };

    let Some(object) = payload.as_object() else {
        warn!("invalid request: payload is not a JSON object");
        return rpc_error(
            Value::Null,
            error::INVALID_REQUEST,
            "Invalid Request: payload must be a JSON object",
        );
    };

    // 2. Capture the id first; every later error echoes it.
    let req_id = object.get("id").cloned().unwrap_or(Value::Null);

    let method = match object.get("method").and_then(Value::as_str) {
        Some(method) if !method.is_empty() => method.to_string(),
        _ => {
            warn!("invalid request: 'method' is missing or not a non-empty string");
            return rpc_error(
                req_id,
                error::INVALID_REQUEST,
                "Invalid Request: 'method' is required and must be a string",
            );
        }
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        warn!(method = %method, "invalid request: 'jsonrpc' is not \"2.0\"");
        return rpc_error(
            req_id,
            error::INVALID_REQUEST,
            "Invalid Request: 'jsonrpc' must be '2.0'",
        );
    }

    let params = object.get("params").cloned().unwrap_or(Value::Null);
    debug!(method = %method, "JSON-RPC request received");

    // 3. Custom methods take precedence over the built-ins.
    if state.methods.contains(&method) {
        // Non-object params coerce to an empty object before the
        // handler's parameter schema is applied.
        let params = if params.is_object() {
            params
        } else {
            Value::Object(serde_json::Map::new())
        };
        let result = state
            .methods
            .dispatch(&method, params, Arc::clone(&state.store))
            .await;
        return match result {
            Some(Ok(value)) => success(req_id, value),
            Some(Err(e)) => failure(req_id, e),
            // contains() said yes; treat a racing disappearance as internal.
            None => failure(req_id, A2AError::internal("handler disappeared")),
        };
    }

    // 4. Built-in protocol methods.
    match method.as_str() {
        "tasks/send" => handle_tasks_send(state, req_id, params).await,
        "tasks/get" => handle_tasks_get(state, req_id, params).await,
        "tasks/cancel" => handle_tasks_cancel(state, req_id, params).await,
        "tasks/sendSubscribe" => handle_tasks_send_subscribe(state, req_id, params).await,
        other => {
            warn!(method = %other, "method not found");
            rpc_error(req_id, error::METHOD_NOT_FOUND, "Method not found")
        }
    }
}

async fn handle_tasks_send(state: Arc<AppState>, req_id: Value, params: Value) -> Response {
    let params: TaskSendParams = match parse_params(params) {
        Ok(params) => params,
        Err(detail) => return respond_invalid_params(req_id, detail),
    };

    let result = state
        .agent
        .handle_task_send(params.id, params.message, state.store.as_ref())
        .await;
    match result {
        Ok(id) => match serde_json::to_value(TaskSendResult { id }) {
            Ok(value) => success(req_id, value),
            Err(e) => serialization_failure(req_id, e),
        },
        Err(e) => failure(req_id, e),
    }
}

async fn handle_tasks_get(state: Arc<AppState>, req_id: Value, params: Value) -> Response {
    let params: TaskGetParams = match parse_params(params) {
        Ok(params) => params,
        Err(detail) => return respond_invalid_params(req_id, detail),
    };

    match state
        .agent
        .handle_task_get(&params.id, state.store.as_ref())
        .await
    {
        Ok(task) => match serde_json::to_value(task) {
            Ok(value) => success(req_id, value),
            Err(e) => serialization_failure(req_id, e),
        },
        Err(e) => failure(req_id, e),
    }
}

async fn handle_tasks_cancel(state: Arc<AppState>, req_id: Value, params: Value) -> Response {
    let params: TaskCancelParams = match parse_params(params) {
        Ok(params) => params,
        Err(detail) => return respond_invalid_params(req_id, detail),
    };

    match state
        .agent
        .handle_task_cancel(&params.id, state.store.as_ref())
        .await
    {
        Ok(success_flag) => {
            let result = TaskCancelResult {
                success: success_flag,
                message: (!success_flag)
                    .then(|| "task could not be canceled in its current state".to_string()),
            };
            match serde_json::to_value(result) {
                Ok(value) => success(req_id, value),
                Err(e) => serialization_failure(req_id, e),
            }
        }
        Err(e) => failure(req_id, e),
    }
}

async fn handle_tasks_send_subscribe(
    state: Arc<AppState>,
    req_id: Value,
    params: Value,
) -> Response {
    let params: TaskSubscribeParams = match parse_params(params) {
        Ok(params) => params,
        Err(detail) => return respond_invalid_params(req_id, detail),
    };

    // Resolve the task before opening the stream: unknown ids get a plain
    // JSON-RPC error response with no SSE bytes.
    match state.store.get_task(&params.id).await {
        Ok(Some(_)) => {}
        Ok(None) => return failure(req_id, A2AError::task_not_found(&params.id)),
        Err(e) => return failure(req_id, e),
    }

    let events = match state
        .agent
        .handle_subscribe(&params.id, state.store.as_ref())
        .await
    {
        Ok(events) => events,
        Err(e) => return failure(req_id, e),
    };

    debug!(task_id = %params.id, "starting SSE stream");
    Sse::new(make_sse_stream(events)).into_response()
}

// ---- Parameter / response helpers ----

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, String> {
    serde_json::from_value(params).map_err(|e| e.to_string())
}

fn respond_invalid_params(req_id: Value, detail: String) -> Response {
    rpc_error(
        req_id,
        error::INVALID_PARAMS,
        &format!("Invalid parameters: {detail}"),
    )
}

fn success(req_id: Value, result: Value) -> Response {
    (
        StatusCode::OK,
        Json(JsonRpcResponse::success(req_id, result)),
    )
        .into_response()
}

/// Map a handler error to its JSON-RPC envelope. Internal errors (-32603)
/// are the one case that also surfaces as HTTP 500.
fn failure(req_id: Value, err: A2AError) -> Response {
    let status = if err.code() == error::INTERNAL_ERROR {
        error!(error = %err, "internal error while handling request");
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        debug!(error = %err, code = err.code(), "request failed");
        StatusCode::OK
    };
    let envelope = JsonRpcResponse::error(req_id, err.into());
    (status, Json(envelope)).into_response()
}

fn serialization_failure(req_id: Value, e: serde_json::Error) -> Response {
    error!(error = %e, "failed to serialize response");
    failure(
        req_id,
        A2AError::internal(format!("failed to serialize response: {e}")),
    )
}

fn rpc_error(req_id: Value, code: i64, message: &str) -> Response {
    let envelope = JsonRpcResponse::error(
        req_id,
        JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        },
    );
    (StatusCode::OK, Json(envelope)).into_response()
}

// ---- SSE emission ----

/// Turn a task event stream into SSE frames.
///
/// Each event becomes `event: <name>\ndata: <json>\n\n`. Serialization
/// failures yield one `event: error` frame and the stream continues; an
/// `Err` item from the source yields one `event: error` frame and closes
/// the stream.
fn make_sse_stream(mut events: TaskEventStream) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => match event.to_wire() {
                    Ok(json) => {
                        yield Ok(Event::default().event(event.event_name()).data(json));
                    }
                    Err(e) => {
                        error!(error = %e, "failed to serialize SSE event");
                        let data = serde_json::json!({
                            "error": "serialization_error",
                            "message": format!("failed to format event: {e}"),
                        });
                        yield Ok(Event::default().event("error").data(data.to_string()));
                    }
                },
                Err(e) => {
                    error!(error = %e, "error in source event stream");
                    let data = serde_json::json!({
                        "error": "stream_error",
                        "message": format!("error generating events: {e}"),
                    });
                    yield Ok(Event::default().event("error").data(data.to_string()));
                    break;
                }
            }
        }
        debug!("SSE stream finished");
    }
}
