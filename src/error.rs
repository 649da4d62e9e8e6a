//! Error taxonomy for the AgentVault A2A core.
//!
//! Two families share one enum:
//! - Protocol errors that map to JSON-RPC error codes (-32700 through
//!   -32603 plus the application range -32000/-32001), produced by the
//!   server dispatch path.
//! - Client-side errors (connection, timeout, authentication, remote
//!   error, malformed envelope, credential store) surfaced by
//!   [`crate::client::A2AClient`] and [`crate::KeyManager`].

use crate::types::JsonRpcError;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 error codes
// ---------------------------------------------------------------------------

/// Invalid JSON was received by the server.
pub const PARSE_ERROR: i64 = -32700;

/// The JSON sent is not a valid Request object.
pub const INVALID_REQUEST: i64 = -32600;

/// The method does not exist / is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Invalid method parameter(s).
pub const INVALID_PARAMS: i64 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// Generic application error raised by agent handler logic.
pub const APPLICATION_ERROR: i64 = -32000;

/// The referenced task id is unknown to the server.
pub const TASK_NOT_FOUND: i64 = -32001;

// ---------------------------------------------------------------------------
// A2AError enum
// ---------------------------------------------------------------------------

/// Unified error type for all A2A operations.
///
/// Every network or credential failure is wrapped into one of these
/// variants; the underlying cause is folded into the message. Variants in
/// the protocol family carry an optional structured `data` payload that is
/// preserved into the JSON-RPC error envelope.
#[derive(Debug, Clone, thiserror::Error)]
pub enum A2AError {
    // -- Protocol errors (map to JSON-RPC error codes) --
    /// Invalid JSON payload (code -32700).
    #[error("Parse error: {message}")]
    Parse {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Malformed request envelope (code -32600).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Unknown JSON-RPC method (code -32601).
    #[error("Method not found: {message}")]
    MethodNotFound {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Parameters failed coercion or validation (code -32602).
    #[error("Invalid params: {message}")]
    InvalidParams {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Unexpected server-side failure (code -32603).
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Declared application-level handler error (code -32000).
    #[error("Agent error: {message}")]
    Application {
        /// Human-readable error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// The referenced task id is unknown (code -32001).
    #[error("Task not found: {task_id}")]
    TaskNotFound {
        /// The id that failed to resolve.
        task_id: String,
    },

    // -- Client-side errors --
    /// DNS, TCP, TLS, or socket-level failure; an SSE stream that ended
    /// abnormally also surfaces as this.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A per-call or token-endpoint timeout expired.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Missing or invalid local credentials, a token endpoint rejection,
    /// or an unsupported auth scheme.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The remote agent returned a JSON-RPC `error` object or a non-2xx
    /// HTTP status on the RPC channel.
    #[error("Remote agent error {code}: {message}")]
    RemoteAgent {
        /// JSON-RPC error code (or HTTP status when no envelope was parsed).
        code: i64,
        /// Error message from the peer.
        message: String,
        /// Optional structured error data from the peer.
        data: Option<serde_json::Value>,
    },

    /// Malformed envelope: invalid JSON, missing both `result` and
    /// `error`, or a result that failed schema validation.
    #[error("Message error: {0}")]
    Message(String),

    /// Keyring write failure. Only raised by
    /// [`crate::KeyManager::set_key_in_keyring`].
    #[error("Credential error: {0}")]
    Credential(String),
}

/// Convenience result type for A2A operations.
pub type A2AResult<T> = Result<T, A2AError>;

impl A2AError {
    /// Create an `InvalidParams` with a message and no data.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `Internal` with a message and no data.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            data: None,
        }
    }

    /// Create an `Application` error with a message and no data.
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
            data: None,
        }
    }

    /// Create a `TaskNotFound` for the given id.
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    /// The JSON-RPC error code for this error.
    ///
    /// Client-side variants that have no protocol code map to -32603,
    /// matching the dispatch rule that any unclassified handler failure is
    /// an internal error.
    pub fn code(&self) -> i64 {
        match self {
            A2AError::Parse { .. } => PARSE_ERROR,
            A2AError::InvalidRequest { .. } => INVALID_REQUEST,
            A2AError::MethodNotFound { .. } => METHOD_NOT_FOUND,
            A2AError::InvalidParams { .. } => INVALID_PARAMS,
            A2AError::Internal { .. } => INTERNAL_ERROR,
            A2AError::Application { .. } => APPLICATION_ERROR,
            A2AError::TaskNotFound { .. } => TASK_NOT_FOUND,
            A2AError::RemoteAgent { code, .. } => *code,
            A2AError::Connection(_)
            | A2AError::Timeout(_)
            | A2AError::Authentication(_)
            | A2AError::Message(_)
            | A2AError::Credential(_) => INTERNAL_ERROR,
        }
    }
}

impl From<A2AError> for JsonRpcError {
    fn from(err: A2AError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let data = match &err {
            A2AError::Parse { data, .. }
            | A2AError::InvalidRequest { data, .. }
            | A2AError::MethodNotFound { data, .. }
            | A2AError::InvalidParams { data, .. }
            | A2AError::Internal { data, .. }
            | A2AError::Application { data, .. }
            | A2AError::RemoteAgent { data, .. } => data.clone(),
            _ => None,
        };
        JsonRpcError {
            code,
            message,
            data,
        }
    }
}
