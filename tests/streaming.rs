//! Streaming tests: client-side SSE consumption (mixed frames, dropped
//! events) and server-side SSE emission (frame format, terminal-event
//! contract, error frames, no SSE bytes for unknown tasks).

mod common;

use std::sync::Arc;

use agentvault::client::A2AClient;
use agentvault::error::A2AResult;
use agentvault::server::{A2aAgent, InMemoryTaskStore, TaskEventStream, TaskStore};
use agentvault::types::{
    A2AEvent, Artifact, Message, TaskState, TaskStatusUpdateEvent,
};
use agentvault::A2AError;
use axum::response::IntoResponse;
use chrono::Utc;
use futures::StreamExt;
use serde_json::{json, Value};

use common::{
    jsonrpc_request, key_manager_with, open_card, recorder, start_agent_server,
    start_scripted_server, PassiveAgent,
};

fn sse_response(body: &'static str) -> axum::response::Response {
    (
        [("Content-Type", "text/event-stream")],
        body,
    )
        .into_response()
}

#[tokio::test]
async fn mixed_frames_yield_typed_events() {
    // Scenario: explicit task_status frame, a heartbeat comment, then a
    // frame with no event name (defaults to the task_message alias).
    let (url, _server) = start_scripted_server(recorder(), |_, _| {
        sse_response(
            "event: task_status\n\
             data: {\"taskId\":\"t-1\",\"state\":\"WORKING\",\"timestamp\":\"2024-01-01T00:00:00Z\"}\n\
             \n\
             : heartbeat\n\
             data: {\"taskId\":\"t-1\",\"message\":{\"role\":\"assistant\",\"parts\":[]}}\n\
             \n",
        )
    })
    .await;
    let card = open_card(&url);
    let (keys, _dir) = key_manager_with(&[]);

    let mut stream = A2AClient::new()
        .receive_messages(&card, "t-1", &keys)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.unwrap());
    }

    assert_eq!(events.len(), 2);
    match &events[0] {
        A2AEvent::Status(update) => {
            assert_eq!(update.task_id, "t-1");
            assert_eq!(update.state, TaskState::Working);
        }
        other => panic!("expected status event, got {other:?}"),
    }
    assert!(matches!(&events[1], A2AEvent::Message(m) if m.task_id == "t-1"));
}

#[tokio::test]
async fn unknown_and_malformed_events_are_dropped() {
    let (url, _server) = start_scripted_server(recorder(), |_, _| {
        sse_response(
            "event: task_bogus\n\
             data: {\"taskId\":\"t-1\"}\n\
             \n\
             data: {not valid json\n\
             \n\
             event: task_status\n\
             data: {\"taskId\":\"t-1\",\"state\":\"COMPLETED\"}\n\
             \n",
        )
    })
    .await;
    let card = open_card(&url);
    let (keys, _dir) = key_manager_with(&[]);

    let mut stream = A2AClient::new()
        .receive_messages(&card, "t-1", &keys)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.unwrap());
    }

    // Only the final valid event survives.
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], A2AEvent::Status(u) if u.state == TaskState::Completed));
}

#[tokio::test]
async fn multi_line_data_joins_before_decoding() {
    let (url, _server) = start_scripted_server(recorder(), |_, _| {
        sse_response(
            "event: task_status\n\
             data: {\"taskId\":\"t-1\",\n\
             data: \"state\":\"WORKING\"}\n\
             \n",
        )
    })
    .await;
    let card = open_card(&url);
    let (keys, _dir) = key_manager_with(&[]);

    let mut stream = A2AClient::new()
        .receive_messages(&card, "t-1", &keys)
        .await
        .unwrap();

    let event = stream.next().await.unwrap().unwrap();
    assert!(matches!(event, A2AEvent::Status(u) if u.state == TaskState::Working));
    assert!(stream.next().await.is_none());
}

// ---- Server-side emission ----

/// Read a raw SSE body into (event_name, data) frames.
fn parse_frames(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .map(|frame| {
            let mut event = String::from("message");
            let mut data = String::new();
            for line in frame.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    event = value.trim_start().to_string();
                } else if let Some(value) = line.strip_prefix("data:") {
                    if !data.is_empty() {
                        data.push('\n');
                    }
                    data.push_str(value.trim_start());
                }
            }
            (event, serde_json::from_str(&data).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn subscribe_streams_until_single_terminal_event() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (base, _server) = start_agent_server(Arc::new(PassiveAgent), store.clone()).await;
    let url = format!("{base}/a2a");

    let task = store.create_task(Message::user_text("go")).await.unwrap();

    let response = reqwest::Client::new()
        .post(&url)
        .header("Content-Type", "application/json")
        .header("Accept", "text/event-stream")
        .json(&jsonrpc_request(
            json!(1),
            "tasks/sendSubscribe",
            json!({"id": task.id}),
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    // Drive the task while the subscriber is attached.
    store.set_state(&task.id, TaskState::Working).await.unwrap();
    store
        .append_message(&task.id, Message::assistant_text("halfway"))
        .await
        .unwrap();
    store
        .append_artifact(
            &task.id,
            Artifact {
                id: "report".to_string(),
                version: 0,
                content: json!({"ok": true}),
                media_type: Some("application/json".to_string()),
                metadata: None,
            },
        )
        .await
        .unwrap();
    store.set_state(&task.id, TaskState::Completed).await.unwrap();

    // The body completes once the terminal status event is emitted.
    let body = response.text().await.unwrap();
    let frames = parse_frames(&body);

    let names: Vec<&str> = frames.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["task_status", "task_message", "task_artifact", "task_status"]
    );
    assert_eq!(frames[0].1["state"], "WORKING");
    assert_eq!(frames[0].1["taskId"], json!(task.id));
    assert_eq!(frames[2].1["artifact"]["id"], "report");
    assert_eq!(frames[3].1["state"], "COMPLETED");

    // Exactly one terminal status event, and it is last.
    let terminal: Vec<_> = frames
        .iter()
        .filter(|(name, data)| {
            name == "task_status"
                && matches!(
                    data["state"].as_str(),
                    Some("COMPLETED") | Some("FAILED") | Some("CANCELED")
                )
        })
        .collect();
    assert_eq!(terminal.len(), 1);
}

#[tokio::test]
async fn unknown_task_subscribe_is_a_plain_error_with_no_sse_bytes() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (base, _server) = start_agent_server(Arc::new(PassiveAgent), store).await;
    let url = format!("{base}/a2a");

    let response = reqwest::Client::new()
        .post(&url)
        .header("Content-Type", "application/json")
        .header("Accept", "text/event-stream")
        .json(&jsonrpc_request(
            json!("sub-1"),
            "tasks/sendSubscribe",
            json!({"id": "nope"}),
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("application/json"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32001);
    assert_eq!(body["id"], "sub-1");
}

#[tokio::test]
async fn generator_failure_emits_stream_error_frame_and_closes() {
    struct FailingAgent;

    #[async_trait::async_trait]
    impl A2aAgent for FailingAgent {
        async fn handle_subscribe(
            &self,
            task_id: &str,
            _store: &dyn TaskStore,
        ) -> A2AResult<TaskEventStream> {
            let first = A2AEvent::Status(TaskStatusUpdateEvent {
                task_id: task_id.to_string(),
                state: TaskState::Working,
                timestamp: Utc::now(),
                message: None,
            });
            let items: Vec<A2AResult<A2AEvent>> = vec![
                Ok(first),
                Err(A2AError::internal("generator blew up")),
            ];
            Ok(futures::stream::iter(items).boxed())
        }
    }

    let store = Arc::new(InMemoryTaskStore::new());
    let task = store.create_task(Message::user_text("go")).await.unwrap();
    let (base, _server) = start_agent_server(Arc::new(FailingAgent), store).await;
    let url = format!("{base}/a2a");

    let response = reqwest::Client::new()
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&jsonrpc_request(
            json!(1),
            "tasks/sendSubscribe",
            json!({"id": task.id}),
        ))
        .send()
        .await
        .unwrap();

    let body = response.text().await.unwrap();
    let frames = parse_frames(&body);

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].0, "task_status");
    assert_eq!(frames[1].0, "error");
    assert_eq!(frames[1].1["error"], "stream_error");
    assert!(frames[1].1["message"]
        .as_str()
        .unwrap()
        .contains("generator blew up"));
}
