//! Shared test utilities for integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use agentvault::builders::AgentCardBuilder;
use agentvault::error::A2AResult;
use agentvault::server::{a2a_router, A2aAgent, InMemoryTaskStore, TaskStore};
use agentvault::types::{AgentCard, Message, TaskState};
use agentvault::KeyManager;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::post;
use axum::Router;

/// Agent that relies entirely on the built-in store-backed handlers.
/// Tests drive task state through the store directly.
pub struct PassiveAgent;

impl A2aAgent for PassiveAgent {}

/// Agent that completes every initiated task in the background:
/// WORKING → echoed assistant message → COMPLETED.
pub struct EchoAgent {
    store: Arc<InMemoryTaskStore>,
}

impl EchoAgent {
    pub fn new(store: Arc<InMemoryTaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl A2aAgent for EchoAgent {
    async fn handle_task_send(
        &self,
        task_id: Option<String>,
        message: Message,
        store: &dyn TaskStore,
    ) -> A2AResult<String> {
        match task_id {
            Some(id) => {
                store.append_message(&id, message).await?;
                Ok(id)
            }
            None => {
                let task = store.create_task(message).await?;
                let id = task.id.clone();
                let store = Arc::clone(&self.store);
                tokio::spawn(async move {
                    // Let subscribers attach before events flow.
                    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
                    let _ = store.set_state(&id, TaskState::Working).await;
                    let _ = store
                        .append_message(&id, Message::assistant_text("echo"))
                        .await;
                    let _ = store.set_state(&id, TaskState::Completed).await;
                });
                Ok(task.id)
            }
        }
    }
}

/// Start an A2A server for `agent` on a random port.
/// Returns the base URL (the endpoint is `{base}/a2a`) and a shutdown handle.
pub async fn start_agent_server(
    agent: Arc<dyn A2aAgent>,
    store: Arc<dyn TaskStore>,
) -> (String, tokio::task::JoinHandle<()>) {
    let app = a2a_router(agent, "/a2a", store);
    serve(app).await
}

/// Serve any router on a random port.
pub async fn serve(app: Router) -> (String, tokio::task::JoinHandle<()>) {
    // Surface library logs in test output when a test fails.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Brief wait for the server to start accepting connections.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (base_url, handle)
}

/// One request captured by a scripted server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Shared log of requests received by a scripted server.
pub type Recorder = Arc<Mutex<Vec<RecordedRequest>>>;

pub fn recorder() -> Recorder {
    Arc::new(Mutex::new(Vec::new()))
}

/// Start a server whose single POST route records each request and
/// responds via `respond`. Used to script exact peer behavior (token
/// endpoints, canned JSON-RPC responses, raw SSE bodies).
pub async fn start_scripted_server<F>(
    recorder: Recorder,
    respond: F,
) -> (String, tokio::task::JoinHandle<()>)
where
    F: Fn(usize, &serde_json::Value) -> Response + Clone + Send + Sync + 'static,
{
    let app = Router::new().route(
        "/",
        post(move |headers: HeaderMap, body: Bytes| {
            let recorder = Arc::clone(&recorder);
            let respond = respond.clone();
            async move {
                let recorded = RecordedRequest {
                    headers,
                    body: body.to_vec(),
                };
                let parsed = serde_json::from_slice(&recorded.body)
                    .unwrap_or(serde_json::Value::Null);
                let count = {
                    let mut log = recorder.lock().unwrap();
                    log.push(recorded);
                    log.len()
                };
                respond(count, &parsed)
            }
        }),
    );
    serve(app).await
}

/// Build a card pointing at `url` with the `none` auth scheme.
pub fn open_card(url: &str) -> AgentCard {
    AgentCardBuilder::new("test-org/echo", "Echo Agent")
        .description("An echo agent for testing")
        .url(url)
        .with_no_auth()
        .build()
        .unwrap()
}

/// Build a card pointing at `url` with an apiKey scheme bound to `service_id`.
pub fn api_key_card(url: &str, service_id: &str) -> AgentCard {
    AgentCardBuilder::new("test-org/echo", "Echo Agent")
        .description("An echo agent for testing")
        .url(url)
        .with_api_key_auth(Some(service_id))
        .build()
        .unwrap()
}

/// Build a card with an oauth2 scheme bound to `service_id`.
pub fn oauth_card(url: &str, token_url: &str, service_id: &str) -> AgentCard {
    AgentCardBuilder::new("test-org/echo", "Echo Agent")
        .description("An echo agent for testing")
        .url(url)
        .with_oauth2_auth(token_url, None, Some(service_id))
        .build()
        .unwrap()
}

/// Key manager loaded from a throwaway `.env` file (environment loading
/// disabled so tests stay hermetic). Returns the temp dir to keep the
/// file alive.
pub fn key_manager_with(entries: &[(&str, &str)]) -> (KeyManager, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.env");
    let mut file = std::fs::File::create(&path).unwrap();
    for (key, value) in entries {
        writeln!(file, "{}={}", key, value).unwrap();
    }
    let manager = KeyManager::builder()
        .key_file(&path)
        .env_vars(false)
        .build();
    (manager, dir)
}

/// Build a JSON-RPC request body.
pub fn jsonrpc_request(
    id: serde_json::Value,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// POST a JSON body to an A2A endpoint, returning (status, parsed body).
pub async fn post_rpc(
    url: &str,
    body: &serde_json::Value,
) -> (reqwest::StatusCode, serde_json::Value) {
    let response = reqwest::Client::new()
        .post(url)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap();
    (status, body)
}
