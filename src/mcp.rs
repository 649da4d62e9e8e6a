//! Model Context Protocol helpers.
//!
//! The A2A protocol carries MCP context as an opaque sub-document under a
//! message's `metadata.mcp_context` key. This module owns the canonical
//! formatting of that sub-document; the client embeds the result via
//! [`inject_mcp_context`].

use tracing::{debug, warn};

use crate::types::Message;

/// Metadata key under which MCP context is embedded.
pub const MCP_CONTEXT_KEY: &str = "mcp_context";

/// Format caller-supplied MCP context into the canonical sub-document.
///
/// Returns `None` when the context is empty or cannot be represented,
/// in which case callers proceed without embedding it.
pub fn format_mcp_context(
    context: &serde_json::Map<String, serde_json::Value>,
) -> Option<serde_json::Value> {
    if context.is_empty() {
        warn!("MCP context is empty, nothing to format");
        return None;
    }
    // Round-trip through serde_json to normalise the document.
    match serde_json::to_value(context) {
        Ok(value) if value.is_object() => Some(value),
        Ok(other) => {
            warn!(value_type = %json_type_name(&other), "MCP context did not format to an object");
            None
        }
        Err(e) => {
            warn!(error = %e, "failed to format MCP context");
            None
        }
    }
}

/// Embed MCP context into a message's metadata, preserving any existing
/// metadata keys. An existing `mcp_context` entry is overwritten.
///
/// Formatting failures degrade gracefully: the message is left unchanged
/// and a warning is logged.
pub(crate) fn inject_mcp_context(
    message: &mut Message,
    context: &serde_json::Map<String, serde_json::Value>,
) {
    match format_mcp_context(context) {
        Some(formatted) => {
            let metadata = message.metadata.get_or_insert_with(serde_json::Map::new);
            metadata.insert(MCP_CONTEXT_KEY.to_string(), formatted);
            debug!("embedded MCP context into message metadata");
        }
        None => {
            warn!("failed to format provided MCP context, sending message without it");
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
