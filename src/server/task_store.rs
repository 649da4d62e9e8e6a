//! Task store — the server's shared mutable state.
//!
//! The [`TaskStore`] trait maps task ids to task state and fans events out
//! to subscribers; all handler-visible mutations go through it. The
//! [`InMemoryTaskStore`] reference implementation keeps everything in one
//! mutex-guarded map with a per-task broadcast channel for event
//! distribution (slow subscribers drop missed events rather than applying
//! backpressure).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::types::{
    A2AEvent, Artifact, Message, Task, TaskArtifactUpdateEvent, TaskMessageEvent, TaskState,
    TaskStatusUpdateEvent,
};

/// A lazy, finite stream of task events, ending after the task's terminal
/// status event (or when the producer completes).
///
/// Items are `Result` so a custom agent generator can surface a mid-stream
/// failure; the router turns an `Err` item into one `event: error` SSE
/// frame and closes the stream.
pub type TaskEventStream = BoxStream<'static, A2AResult<A2AEvent>>;

/// Persistence and event-distribution interface consumed by the server
/// handlers.
///
/// Contracts:
/// - `set_state` enforces the task state machine; invalid transitions are
///   rejected without side effects.
/// - every mutation that succeeds is broadcast to active subscribers as
///   the corresponding [`A2AEvent`], in mutation order.
/// - exactly one terminal status event is ever emitted per task, and it is
///   the last event subscribers see.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a fresh task in `SUBMITTED` state seeded with the initial
    /// message. Returns the new task snapshot.
    async fn create_task(&self, initial_message: Message) -> A2AResult<Task>;

    /// Fetch a task snapshot. Returns `None` for unknown ids.
    async fn get_task(&self, task_id: &str) -> A2AResult<Option<Task>>;

    /// Append a message to a task's history.
    ///
    /// # Errors
    ///
    /// [`A2AError::TaskNotFound`] for unknown ids.
    async fn append_message(&self, task_id: &str, message: Message) -> A2AResult<()>;

    /// Attach or update an artifact. Re-appending an existing artifact id
    /// replaces it with a monotonically bumped version.
    ///
    /// # Errors
    ///
    /// [`A2AError::TaskNotFound`] for unknown ids.
    async fn append_artifact(&self, task_id: &str, artifact: Artifact) -> A2AResult<()>;

    /// Transition a task to `new_state`, enforcing monotonicity.
    ///
    /// Returns whether the transition was applied: `Ok(false)` means the
    /// state machine rejected it (e.g. the task is already terminal) and
    /// nothing changed.
    ///
    /// # Errors
    ///
    /// [`A2AError::TaskNotFound`] for unknown ids.
    async fn set_state(&self, task_id: &str, new_state: TaskState) -> A2AResult<bool>;

    /// Subscribe to a task's future events. The stream ends after the
    /// terminal status event; subscribing to an already-terminal task
    /// yields an empty stream.
    ///
    /// # Errors
    ///
    /// [`A2AError::TaskNotFound`] for unknown ids.
    async fn subscribe(&self, task_id: &str) -> A2AResult<TaskEventStream>;
}

/// Default broadcast capacity per task.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

struct TaskEntry {
    task: Task,
    events: broadcast::Sender<A2AEvent>,
}

/// In-memory [`TaskStore`] backed by a mutex-guarded `HashMap`.
///
/// Suitable for development, testing, and single-instance agents. Task
/// data is lost when the process exits.
pub struct InMemoryTaskStore {
    entries: Mutex<HashMap<String, TaskEntry>>,
    channel_capacity: usize,
}

impl InMemoryTaskStore {
    /// Create an empty store with the default event channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create an empty store with a custom per-task event channel
    /// capacity. Subscribers that fall more than `capacity` events behind
    /// skip the missed events.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        Self {
            entries: Mutex::new(HashMap::new()),
            channel_capacity: capacity,
        }
    }

    /// Broadcast an event, tolerating the no-subscribers case.
    fn publish(entry: &TaskEntry, event: A2AEvent) {
        match entry.events.send(event) {
            Ok(count) => debug!(subscribers = count, "published task event"),
            Err(_) => debug!("no subscribers for task event"),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, initial_message: Message) -> A2AResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: format!("task-{}", Uuid::new_v4()),
            state: TaskState::Submitted,
            messages: vec![initial_message],
            artifacts: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let (events, _) = broadcast::channel(self.channel_capacity);

        let mut entries = self.entries.lock().await;
        entries.insert(
            task.id.clone(),
            TaskEntry {
                task: task.clone(),
                events,
            },
        );
        debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    async fn get_task(&self, task_id: &str) -> A2AResult<Option<Task>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(task_id).map(|entry| entry.task.clone()))
    }

    async fn append_message(&self, task_id: &str, message: Message) -> A2AResult<()> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(task_id)
            .ok_or_else(|| A2AError::task_not_found(task_id))?;

        let now = Utc::now();
        entry.task.messages.push(message.clone());
        entry.task.updated_at = now;

        Self::publish(
            entry,
            A2AEvent::Message(TaskMessageEvent {
                task_id: task_id.to_string(),
                message,
                timestamp: now,
            }),
        );
        Ok(())
    }

    async fn append_artifact(&self, task_id: &str, mut artifact: Artifact) -> A2AResult<()> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(task_id)
            .ok_or_else(|| A2AError::task_not_found(task_id))?;

        let now = Utc::now();
        match entry
            .task
            .artifacts
            .iter_mut()
            .find(|existing| existing.id == artifact.id)
        {
            Some(existing) => {
                // Stable id, monotonically bumped version.
                artifact.version = existing.version.saturating_add(1).max(artifact.version);
                *existing = artifact.clone();
            }
            None => entry.task.artifacts.push(artifact.clone()),
        }
        entry.task.updated_at = now;

        Self::publish(
            entry,
            A2AEvent::Artifact(TaskArtifactUpdateEvent {
                task_id: task_id.to_string(),
                artifact,
                timestamp: now,
            }),
        );
        Ok(())
    }

    async fn set_state(&self, task_id: &str, new_state: TaskState) -> A2AResult<bool> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(task_id)
            .ok_or_else(|| A2AError::task_not_found(task_id))?;

        let current = entry.task.state;
        if !current.can_transition_to(new_state) {
            debug!(
                task_id = %task_id,
                from = %current,
                to = %new_state,
                "rejected task state transition"
            );
            return Ok(false);
        }

        let now = Utc::now();
        entry.task.state = new_state;
        entry.task.updated_at = now;
        debug!(task_id = %task_id, from = %current, to = %new_state, "task state changed");

        Self::publish(
            entry,
            A2AEvent::Status(TaskStatusUpdateEvent {
                task_id: task_id.to_string(),
                state: new_state,
                timestamp: now,
                message: None,
            }),
        );
        Ok(true)
    }

    async fn subscribe(&self, task_id: &str) -> A2AResult<TaskEventStream> {
        let entries = self.entries.lock().await;
        let entry = entries
            .get(task_id)
            .ok_or_else(|| A2AError::task_not_found(task_id))?;

        if entry.task.state.is_terminal() {
            debug!(task_id = %task_id, "subscribe on terminal task yields empty stream");
            return Ok(futures::stream::empty().boxed());
        }

        let mut rx = entry.events.subscribe();
        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let is_terminal =
                            matches!(&event, A2AEvent::Status(e) if e.state.is_terminal());
                        yield Ok(event);
                        if is_terminal {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Slow-subscriber drop policy: skip what was missed.
                        warn!(missed, "task event subscriber lagged, dropping missed events");
                        continue;
                    }
                }
            }
        };
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_task_starts_submitted_with_history() {
        let store = InMemoryTaskStore::new();
        let task = store
            .create_task(Message::user_text("hello"))
            .await
            .unwrap();
        assert_eq!(task.state, TaskState::Submitted);
        assert_eq!(task.messages.len(), 1);
        assert!(task.artifacts.is_empty());

        let fetched = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, task.id);
    }

    #[tokio::test]
    async fn unknown_ids_error_or_none() {
        let store = InMemoryTaskStore::new();
        assert!(store.get_task("nope").await.unwrap().is_none());
        assert!(matches!(
            store.append_message("nope", Message::user_text("x")).await,
            Err(A2AError::TaskNotFound { .. })
        ));
        assert!(matches!(
            store.set_state("nope", TaskState::Working).await,
            Err(A2AError::TaskNotFound { .. })
        ));
        assert!(matches!(
            store.subscribe("nope").await,
            Err(A2AError::TaskNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn state_machine_is_enforced() {
        let store = InMemoryTaskStore::new();
        let task = store.create_task(Message::user_text("go")).await.unwrap();

        // SUBMITTED cannot complete directly.
        assert!(!store.set_state(&task.id, TaskState::Completed).await.unwrap());
        assert!(store.set_state(&task.id, TaskState::Working).await.unwrap());
        assert!(store.set_state(&task.id, TaskState::Completed).await.unwrap());

        // Terminal: nothing moves any more.
        assert!(!store.set_state(&task.id, TaskState::Working).await.unwrap());
        assert!(!store.set_state(&task.id, TaskState::Canceled).await.unwrap());
        let snapshot = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(snapshot.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn artifact_versions_bump_monotonically() {
        let store = InMemoryTaskStore::new();
        let task = store.create_task(Message::user_text("go")).await.unwrap();

        let artifact = Artifact {
            id: "out".to_string(),
            version: 0,
            content: serde_json::json!("v0"),
            media_type: None,
            metadata: None,
        };
        store.append_artifact(&task.id, artifact.clone()).await.unwrap();
        store.append_artifact(&task.id, artifact).await.unwrap();

        let snapshot = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(snapshot.artifacts.len(), 1);
        assert_eq!(snapshot.artifacts[0].version, 1);
    }

    #[tokio::test]
    async fn subscribers_see_events_until_terminal() {
        let store = InMemoryTaskStore::new();
        let task = store.create_task(Message::user_text("go")).await.unwrap();
        let mut events = store.subscribe(&task.id).await.unwrap();

        store.set_state(&task.id, TaskState::Working).await.unwrap();
        store
            .append_message(&task.id, Message::assistant_text("thinking"))
            .await
            .unwrap();
        store.set_state(&task.id, TaskState::Completed).await.unwrap();
        // Rejected transition after terminal: no event.
        assert!(!store.set_state(&task.id, TaskState::Working).await.unwrap());

        let mut seen = Vec::new();
        while let Some(event) = events.next().await {
            seen.push(event.unwrap());
        }

        assert_eq!(seen.len(), 3);
        assert!(matches!(&seen[0], A2AEvent::Status(e) if e.state == TaskState::Working));
        assert!(matches!(&seen[1], A2AEvent::Message(_)));
        assert!(matches!(&seen[2], A2AEvent::Status(e) if e.state == TaskState::Completed));

        // Exactly one terminal status event, and it is last.
        let terminal_count = seen
            .iter()
            .filter(|e| matches!(e, A2AEvent::Status(s) if s.state.is_terminal()))
            .count();
        assert_eq!(terminal_count, 1);
    }

    #[tokio::test]
    async fn subscribe_on_terminal_task_is_empty() {
        let store = InMemoryTaskStore::new();
        let task = store.create_task(Message::user_text("go")).await.unwrap();
        store.set_state(&task.id, TaskState::Canceled).await.unwrap();

        let mut events = store.subscribe(&task.id).await.unwrap();
        assert!(events.next().await.is_none());
    }
}
