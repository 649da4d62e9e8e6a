//! AgentVault A2A protocol types.
//!
//! Covers the agent card descriptor, the task/message/artifact data model,
//! the streaming event variants, and the JSON-RPC 2.0 envelopes. Wire field
//! names are camelCase except where the card schema historically used
//! snake_case (`service_identifier`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{A2AError, A2AResult};

// ============================================================================
// Agent card
// ============================================================================

/// Authentication scheme kinds an agent endpoint may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthScheme {
    /// Static API key sent as `X-Api-Key`.
    #[serde(rename = "apiKey")]
    ApiKey,
    /// Caller-supplied bearer token. Declared by some agents but not
    /// negotiated by this client.
    #[serde(rename = "bearer")]
    Bearer,
    /// OAuth2 client-credentials grant against the card's `tokenUrl`.
    #[serde(rename = "oauth2")]
    OAuth2,
    /// No authentication.
    #[serde(rename = "none")]
    None,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthScheme::ApiKey => "apiKey",
            AuthScheme::Bearer => "bearer",
            AuthScheme::OAuth2 => "oauth2",
            AuthScheme::None => "none",
        };
        write!(f, "{}", s)
    }
}

/// One authentication scheme supported by an agent's A2A endpoint.
///
/// `service_identifier` keeps its snake_case wire name for compatibility
/// with existing agent cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAuthentication {
    /// The scheme kind.
    pub scheme: AuthScheme,

    /// Human-readable description of how to obtain credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Identifier under which the local key manager looks up credentials.
    /// Defaults to the card's `humanReadableId` when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_identifier: Option<String>,

    /// OAuth2 token endpoint. Required when `scheme` is `oauth2`.
    #[serde(rename = "tokenUrl", skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    /// OAuth2 scopes to request, space-joined into the token request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl AgentAuthentication {
    /// Create a scheme entry with no optional fields set.
    pub fn new(scheme: AuthScheme) -> Self {
        Self {
            scheme,
            description: None,
            service_identifier: None,
            token_url: None,
            scopes: None,
        }
    }
}

/// Protocol capabilities advertised by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// A2A protocol version supported by the endpoint.
    pub a2a_version: String,

    /// Model Context Protocol version, if the agent accepts MCP context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_version: Option<String>,

    /// Message part types the agent accepts. Absent means basic types only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_message_parts: Option<Vec<String>>,
}

/// Immutable metadata descriptor for a remote agent.
///
/// Retrieved out-of-band (e.g. from a registry); the client reads the
/// endpoint URL and authentication requirements from it and never mutates
/// it. Use [`AgentCard::from_json`] to parse and validate in one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Version of the card schema itself.
    pub schema_version: String,

    /// User-friendly unique identifier, e.g. `my-org/weather-reporter`.
    /// Doubles as the default service identifier for credential lookup.
    pub human_readable_id: String,

    /// Version of the agent software.
    pub agent_version: String,

    /// Display name.
    pub name: String,

    /// Description of the agent's purpose.
    pub description: String,

    /// Primary A2A JSON-RPC endpoint. Must be HTTPS unless the host is
    /// `localhost` or a loopback literal (`127.0.0.1`, `[::1]`).
    pub url: String,

    /// Protocol capabilities.
    pub capabilities: AgentCapabilities,

    /// Supported authentication schemes, in declaration order. Never empty
    /// on a valid card.
    pub auth_schemes: Vec<AgentAuthentication>,
}

impl AgentCard {
    /// Parse a card from JSON and validate it.
    pub fn from_json(value: serde_json::Value) -> A2AResult<Self> {
        let card: AgentCard = serde_json::from_value(value)
            .map_err(|e| A2AError::Message(format!("failed to parse agent card: {e}")))?;
        card.validate()?;
        Ok(card)
    }

    /// Check the card invariants: at least one auth scheme, and an HTTPS
    /// endpoint URL unless the host is `localhost` or a loopback literal.
    pub fn validate(&self) -> A2AResult<()> {
        if self.auth_schemes.is_empty() {
            return Err(A2AError::Message(format!(
                "agent card '{}' declares no auth schemes",
                self.human_readable_id
            )));
        }
        let url = self.url.as_str();
        let localhost = url.starts_with("http://localhost")
            || url.starts_with("http://127.0.0.1")
            || url.starts_with("http://[::1]");
        if !url.starts_with("https://") && !localhost {
            return Err(A2AError::Message(format!(
                "agent card '{}' URL must use HTTPS unless it is localhost: {}",
                self.human_readable_id, url
            )));
        }
        Ok(())
    }

    /// The service identifier to use for a given auth scheme entry:
    /// the scheme's `service_identifier` if set, else the card's
    /// `humanReadableId`.
    pub fn service_id_for<'a>(&'a self, scheme: &'a AgentAuthentication) -> &'a str {
        scheme
            .service_identifier
            .as_deref()
            .unwrap_or(&self.human_readable_id)
    }
}

// ============================================================================
// Messages, tasks, artifacts
// ============================================================================

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the client / user side.
    User,
    /// Message produced by the agent.
    Assistant,
    /// System-injected message.
    System,
}

/// A single message in a task conversation.
///
/// The protocol treats message content as transparent: `parts` are opaque
/// JSON values that are carried through unchanged. `metadata` is where the
/// client embeds MCP context (under the `mcp_context` key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message.
    pub role: Role,

    /// Opaque content parts.
    pub parts: Vec<serde_json::Value>,

    /// Arbitrary metadata mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Message {
    /// Build a user message with a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            role: Role::User,
            parts: vec![serde_json::json!({"type": "text", "content": text})],
            metadata: None,
        }
    }

    /// Build an assistant message with a single text part.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            role: Role::Assistant,
            parts: vec![serde_json::json!({"type": "text", "content": text})],
            metadata: None,
        }
    }
}

/// The lifecycle state of a task.
///
/// Serialized as SCREAMING_SNAKE_CASE wire strings (`"WORKING"`,
/// `"INPUT_REQUIRED"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Task has been received but not yet started.
    Submitted,
    /// Task is actively being processed.
    Working,
    /// Task is paused waiting for additional client input.
    InputRequired,
    /// Task completed successfully. Terminal.
    Completed,
    /// Task failed. Terminal.
    Failed,
    /// Task was canceled. Terminal.
    Canceled,
}

impl TaskState {
    /// Whether this state admits no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }

    /// Whether the state machine allows a transition from `self` to `next`.
    ///
    /// ```text
    /// SUBMITTED → WORKING → {COMPLETED, FAILED, CANCELED}
    /// SUBMITTED → INPUT_REQUIRED ⇄ WORKING
    /// any non-terminal → CANCELED
    /// ```
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == TaskState::Canceled {
            return true;
        }
        match self {
            TaskState::Submitted => {
                matches!(next, TaskState::Working | TaskState::InputRequired)
            }
            TaskState::Working => matches!(
                next,
                TaskState::InputRequired | TaskState::Completed | TaskState::Failed
            ),
            TaskState::InputRequired => matches!(next, TaskState::Working),
            _ => false,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Submitted => "SUBMITTED",
            TaskState::Working => "WORKING",
            TaskState::InputRequired => "INPUT_REQUIRED",
            TaskState::Completed => "COMPLETED",
            TaskState::Failed => "FAILED",
            TaskState::Canceled => "CANCELED",
        };
        write!(f, "{}", s)
    }
}

/// An output produced by a task, identified by a stable id and versioned
/// monotonically as it is updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Stable artifact identifier within the task.
    pub id: String,

    /// Monotonic version; bumped each time the artifact is replaced.
    #[serde(default)]
    pub version: u64,

    /// Opaque artifact content.
    pub content: serde_json::Value,

    /// MIME type of the content, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Arbitrary metadata mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A stateful long-running conversation with an agent, identified by a
/// server-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Server-assigned task identifier.
    pub id: String,

    /// Current lifecycle state.
    pub state: TaskState,

    /// Ordered message history.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Artifacts produced so far.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Streaming events
// ============================================================================

/// Notification that a task's state changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    /// The task whose state changed.
    pub task_id: String,

    /// The new state.
    pub state: TaskState,

    /// When the transition happened. Defaults to now when absent on the wire.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Optional message accompanying the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// A message produced by the agent for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMessageEvent {
    /// The task the message belongs to.
    pub task_id: String,

    /// The message payload.
    pub message: Message,

    /// When the message was produced. Defaults to now when absent.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Notification that an artifact was created or updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    /// The task that produced the artifact.
    pub task_id: String,

    /// The new or updated artifact.
    pub artifact: Artifact,

    /// When the update happened. Defaults to now when absent.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// SSE event name for status updates.
pub const EVENT_TASK_STATUS: &str = "task_status";
/// SSE event name for task messages.
pub const EVENT_TASK_MESSAGE: &str = "task_message";
/// SSE event name for artifact updates.
pub const EVENT_TASK_ARTIFACT: &str = "task_artifact";
/// Accepted alias for [`EVENT_TASK_MESSAGE`]; also the SSE default event
/// name when a frame carries no `event:` field.
pub const EVENT_MESSAGE_ALIAS: &str = "message";

/// A streaming task update, discriminated on the SSE event name rather
/// than an embedded tag field.
///
/// The wire payload of each variant is the inner struct serialized as a
/// bare JSON object; the variant is chosen by the `event:` field of the
/// SSE frame ([`A2AEvent::from_wire`] / [`A2AEvent::event_name`]).
#[derive(Debug, Clone)]
pub enum A2AEvent {
    /// `task_status` — the task changed state.
    Status(TaskStatusUpdateEvent),
    /// `task_message` (or the `message` alias) — the agent produced a message.
    Message(TaskMessageEvent),
    /// `task_artifact` — an artifact was created or updated.
    Artifact(TaskArtifactUpdateEvent),
}

impl A2AEvent {
    /// The SSE event name this variant is emitted under.
    pub fn event_name(&self) -> &'static str {
        match self {
            A2AEvent::Status(_) => EVENT_TASK_STATUS,
            A2AEvent::Message(_) => EVENT_TASK_MESSAGE,
            A2AEvent::Artifact(_) => EVENT_TASK_ARTIFACT,
        }
    }

    /// The task id the event refers to.
    pub fn task_id(&self) -> &str {
        match self {
            A2AEvent::Status(e) => &e.task_id,
            A2AEvent::Message(e) => &e.task_id,
            A2AEvent::Artifact(e) => &e.task_id,
        }
    }

    /// Serialize the event payload (the bare inner object, no tag field).
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        match self {
            A2AEvent::Status(e) => serde_json::to_string(e),
            A2AEvent::Message(e) => serde_json::to_string(e),
            A2AEvent::Artifact(e) => serde_json::to_string(e),
        }
    }

    /// Decode an event from an SSE event name and its JSON data payload.
    ///
    /// `message` is accepted as an alias for `task_message`. Unknown event
    /// names and payloads that fail validation both return an error; the
    /// streaming layers log and drop those events rather than surfacing
    /// them to the consumer.
    pub fn from_wire(event_name: &str, data: serde_json::Value) -> A2AResult<Self> {
        let invalid =
            |e: serde_json::Error| A2AError::Message(format!("invalid '{event_name}' event payload: {e}"));
        match event_name {
            EVENT_TASK_STATUS => Ok(A2AEvent::Status(
                serde_json::from_value(data).map_err(invalid)?,
            )),
            EVENT_TASK_MESSAGE | EVENT_MESSAGE_ALIAS => Ok(A2AEvent::Message(
                serde_json::from_value(data).map_err(invalid)?,
            )),
            EVENT_TASK_ARTIFACT => Ok(A2AEvent::Artifact(
                serde_json::from_value(data).map_err(invalid)?,
            )),
            other => Err(A2AError::Message(format!(
                "unknown SSE event type: '{other}'"
            ))),
        }
    }
}

// ============================================================================
// JSON-RPC 2.0 envelopes
// ============================================================================

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,

    /// Method name, e.g. `tasks/send`.
    pub method: String,

    /// Method parameters.
    #[serde(default)]
    pub params: serde_json::Value,

    /// Request id echoed back in the response. String, number, or null.
    pub id: serde_json::Value,
}

impl JsonRpcRequest {
    /// Build a request with the standard version marker.
    pub fn new(
        method: impl Into<String>,
        params: serde_json::Value,
        id: serde_json::Value,
    ) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i64,

    /// Human-readable message.
    pub message: String,

    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A JSON-RPC 2.0 response envelope. Exactly one of `result` / `error`
/// is present on a well-formed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,

    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Failure payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,

    /// The request id this responds to.
    pub id: serde_json::Value,
}

impl JsonRpcResponse {
    /// Build a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Build an error response.
    pub fn error(id: serde_json::Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

// ============================================================================
// Method parameter / result types
// ============================================================================

/// Parameters for `tasks/send`.
///
/// `id` is serialized even when null: a null id asks the server to create
/// a fresh task, a string id appends to an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSendParams {
    /// Target task id, or `None` to initiate a new task.
    pub id: Option<String>,

    /// The message to deliver.
    pub message: Message,
}

/// Result of `tasks/send`: the (possibly fresh) task id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSendResult {
    /// The task the message was routed to.
    pub id: String,
}

/// Parameters for `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGetParams {
    /// The task to fetch.
    pub id: String,
}

/// Parameters for `tasks/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCancelParams {
    /// The task to cancel.
    pub id: String,
}

/// Result of `tasks/cancel`.
///
/// `success: false` is a *successful* RPC meaning the task could not be
/// canceled (typically because it is already terminal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCancelResult {
    /// Whether the cancellation was applied.
    pub success: bool,

    /// Optional explanation when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Parameters for `tasks/sendSubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSubscribeParams {
    /// The task to stream events for.
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_state_wire_format_is_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&TaskState::InputRequired).unwrap(),
            "\"INPUT_REQUIRED\""
        );
        let s: TaskState = serde_json::from_str("\"WORKING\"").unwrap();
        assert_eq!(s, TaskState::Working);
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        for terminal in [TaskState::Completed, TaskState::Failed, TaskState::Canceled] {
            assert!(terminal.is_terminal());
            for next in [
                TaskState::Submitted,
                TaskState::Working,
                TaskState::InputRequired,
                TaskState::Completed,
                TaskState::Failed,
                TaskState::Canceled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn any_non_terminal_state_can_cancel() {
        for state in [
            TaskState::Submitted,
            TaskState::Working,
            TaskState::InputRequired,
        ] {
            assert!(state.can_transition_to(TaskState::Canceled));
        }
    }

    #[test]
    fn input_required_round_trips_with_working() {
        assert!(TaskState::Working.can_transition_to(TaskState::InputRequired));
        assert!(TaskState::InputRequired.can_transition_to(TaskState::Working));
        assert!(!TaskState::InputRequired.can_transition_to(TaskState::Completed));
    }

    #[test]
    fn event_name_round_trip() {
        let event = A2AEvent::Status(TaskStatusUpdateEvent {
            task_id: "t-1".to_string(),
            state: TaskState::Working,
            timestamp: Utc::now(),
            message: None,
        });
        assert_eq!(event.event_name(), "task_status");
        let json: serde_json::Value = serde_json::from_str(&event.to_wire().unwrap()).unwrap();
        let decoded = A2AEvent::from_wire("task_status", json).unwrap();
        assert!(matches!(decoded, A2AEvent::Status(e) if e.state == TaskState::Working));
    }

    #[test]
    fn message_alias_decodes_as_task_message() {
        let data = serde_json::json!({
            "taskId": "t-1",
            "message": {"role": "assistant", "parts": []}
        });
        let decoded = A2AEvent::from_wire("message", data).unwrap();
        assert!(matches!(decoded, A2AEvent::Message(_)));
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        let err = A2AEvent::from_wire("task_bogus", serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("unknown SSE event type"));
    }

    #[test]
    fn status_event_timestamp_defaults_when_absent() {
        let data = serde_json::json!({"taskId": "t-1", "state": "WORKING"});
        let decoded = A2AEvent::from_wire("task_status", data).unwrap();
        assert!(matches!(decoded, A2AEvent::Status(_)));
    }

    #[test]
    fn task_send_params_serialize_null_id() {
        let params = TaskSendParams {
            id: None,
            message: Message::user_text("hello"),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("id").unwrap().is_null());
    }

    #[test]
    fn agent_card_requires_https_or_localhost() {
        let card = AgentCard {
            schema_version: "1.0".to_string(),
            human_readable_id: "org/agent".to_string(),
            agent_version: "0.1.0".to_string(),
            name: "Agent".to_string(),
            description: "Test".to_string(),
            url: "http://example.com/a2a".to_string(),
            capabilities: AgentCapabilities {
                a2a_version: "1.0".to_string(),
                mcp_version: None,
                supported_message_parts: None,
            },
            auth_schemes: vec![AgentAuthentication::new(AuthScheme::None)],
        };
        assert!(card.validate().is_err());

        let mut localhost = card.clone();
        localhost.url = "http://localhost:8000/a2a".to_string();
        assert!(localhost.validate().is_ok());

        // Loopback literals are treated like localhost.
        let mut loopback = card.clone();
        loopback.url = "http://127.0.0.1:8000/a2a".to_string();
        assert!(loopback.validate().is_ok());
        loopback.url = "http://[::1]:8000/a2a".to_string();
        assert!(loopback.validate().is_ok());

        let mut https = card.clone();
        https.url = "https://example.com/a2a".to_string();
        assert!(https.validate().is_ok());

        let mut no_schemes = card;
        no_schemes.url = "https://example.com/a2a".to_string();
        no_schemes.auth_schemes.clear();
        assert!(no_schemes.validate().is_err());
    }

    #[test]
    fn agent_card_service_id_defaults_to_human_readable_id() {
        let mut scheme = AgentAuthentication::new(AuthScheme::ApiKey);
        let card = AgentCard {
            schema_version: "1.0".to_string(),
            human_readable_id: "org/agent".to_string(),
            agent_version: "0.1.0".to_string(),
            name: "Agent".to_string(),
            description: "Test".to_string(),
            url: "https://example.com/a2a".to_string(),
            capabilities: AgentCapabilities {
                a2a_version: "1.0".to_string(),
                mcp_version: None,
                supported_message_parts: None,
            },
            auth_schemes: vec![scheme.clone()],
        };
        assert_eq!(card.service_id_for(&scheme), "org/agent");
        scheme.service_identifier = Some("demo".to_string());
        assert_eq!(card.service_id_for(&scheme), "demo");
    }

    #[test]
    fn auth_scheme_wire_names() {
        assert_eq!(
            serde_json::to_string(&AuthScheme::ApiKey).unwrap(),
            "\"apiKey\""
        );
        assert_eq!(
            serde_json::to_string(&AuthScheme::OAuth2).unwrap(),
            "\"oauth2\""
        );
    }
}
