//! Typed parameter and result shapes for the session's wire methods.
//!
//! The outbound surface sends `register_tool`, `register_mcp`,
//! `list_functions`, `get_function_details` and `execute`; the peer calls
//! back with `execute_tool` and pushes `session_created` at handshake. Each
//! method's params and result get a struct here so the engine never touches
//! loose JSON beyond the envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frame::RpcId;

// ── Tool registration ───────────────────────────────────────────────

/// Wire shape announcing one local tool (`register_tool` params).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

impl ToolSpec {
    /// Qualified `namespace.name` form used in logs and peer-side catalogs.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

// ── MCP source registration ─────────────────────────────────────────

/// `register_mcp` params: an external tool source the peer should attach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerSpec {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<McpAuth>,
}

/// Authentication for an MCP source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpAuth {
    Bearer { token: String },
    Headers { headers: HashMap<String, String> },
}

// ── Code execution ──────────────────────────────────────────────────

/// `execute` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteCodeParams {
    pub code: String,
}

/// `get_function_details` params; entries are qualified `Namespace.name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFunctionDetailsParams {
    pub functions: Vec<String>,
}

// ── Peer-initiated tool calls ───────────────────────────────────────

/// Params of the peer's `execute_tool` request against a local tool.
///
/// Some peer generations duplicate the envelope id inside the params. It is
/// accepted and ignored; replies always correlate on the envelope id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteToolParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RpcId>,
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

// ── Handshake ───────────────────────────────────────────────────────

/// Params of the `session_created` notification pushed by the peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreatedParams {
    pub session_id: String,
}

// ── Operation results ───────────────────────────────────────────────

/// Result of `register_tool` and `register_mcp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterOutcome {
    pub success: bool,
}

/// One entry in a `list_functions` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListedFunction {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of `list_functions`: the catalog plus calling-convention stubs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFunctionsOutput {
    pub functions: Vec<ListedFunction>,
    pub code: String,
}

/// Full signature information for one function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDetails {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_type: String,
    pub output_type: String,
    pub types: String,
}

/// Result of `get_function_details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFunctionDetailsOutput {
    pub functions: Vec<FunctionDetails>,
    pub code: String,
}

/// Result of `execute`: sandbox outcome plus captured console streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}
