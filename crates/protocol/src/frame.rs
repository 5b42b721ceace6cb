//! JSON-RPC 2.0 envelope types and frame classification.
//!
//! Every message on the wire is one JSON object. Four envelope shapes exist:
//! requests (method + id), notifications (method, no id), success replies
//! (result) and error replies (error). [`Frame::parse`] decides which shape a
//! raw message is before handing back the typed struct, the same way the
//! reader side must classify traffic: a reply is matched to a pending call by
//! id, a request is routed to a local tool, everything else is noise.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Envelope types ──────────────────────────────────────────────────

/// A call initiated by either side. The `id` correlates the eventual reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RpcId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A successful reply to a [`Request`], carrying the call's result value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: RpcId,
    pub result: Value,
}

/// An error reply to a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub jsonrpc: String,
    pub id: RpcId,
    pub error: RpcError,
}

/// The error object inside an [`ErrorResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A one-way message; no reply is expected or correlated.
///
/// The call protocol itself never uses notifications — every call expects
/// exactly one reply — but the peer pushes `session_created` as a
/// notification during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC request id. Can be a number or a string per JSON-RPC 2.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    String(String),
}

impl fmt::Display for RpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcId::Number(n) => write!(f, "{}", n),
            RpcId::String(s) => write!(f, "{}", s),
        }
    }
}

// ── Standard JSON-RPC error codes ───────────────────────────────────

/// Standard JSON-RPC 2.0 error codes, plus the reserved-range code the peer
/// uses for missing resources.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const RESOURCE_NOT_FOUND: i64 = -32002;
}

// ── Frame classification ────────────────────────────────────────────

/// One decoded wire frame.
#[derive(Debug, Clone)]
pub enum Frame {
    Request(Request),
    Response(Response),
    Error(ErrorResponse),
    Notification(Notification),
}

impl Frame {
    /// Classify and decode a raw message by its envelope shape.
    ///
    /// A `method` field with an `id` is a request, `method` alone is a
    /// notification, `result` is a success reply, `error` is an error reply.
    /// Anything else fails with [`DecodeError::InvalidEnvelope`].
    pub fn parse(raw: &str) -> Result<Frame, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(DecodeError::InvalidEnvelope);
        }

        let has_id = value.get("id").is_some();
        if value.get("method").is_some() {
            if has_id {
                return Ok(Frame::Request(serde_json::from_value(value)?));
            }
            return Ok(Frame::Notification(serde_json::from_value(value)?));
        }
        if value.get("result").is_some() {
            return Ok(Frame::Response(serde_json::from_value(value)?));
        }
        if value.get("error").is_some() {
            return Ok(Frame::Error(serde_json::from_value(value)?));
        }
        Err(DecodeError::InvalidEnvelope)
    }

    /// The correlation id, if this frame kind carries one.
    pub fn id(&self) -> Option<&RpcId> {
        match self {
            Frame::Request(r) => Some(&r.id),
            Frame::Response(r) => Some(&r.id),
            Frame::Error(e) => Some(&e.id),
            Frame::Notification(_) => None,
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

impl Request {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(id: RpcId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

impl Response {
    /// Create a successful reply.
    pub fn ok(id: RpcId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result,
        }
    }
}

impl ErrorResponse {
    /// Create an error reply with the given code and message.
    pub fn new(id: RpcId, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            error: RpcError {
                code,
                message: message.into(),
                data: None,
            },
        }
    }
}

impl Notification {
    /// Create a new JSON-RPC 2.0 notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Errors produced while decoding a raw frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a request, reply, or notification")]
    InvalidEnvelope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let req = Request::new(
            RpcId::Number(1),
            "execute",
            Some(serde_json::json!({"code": "async function run() {}"})),
        );
        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.method, "execute");
        assert_eq!(parsed.id, RpcId::Number(1));
        assert_eq!(parsed.jsonrpc, "2.0");
    }

    #[test]
    fn test_request_without_params_omits_field() {
        let req = Request::new(RpcId::Number(7), "list_functions", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("params"));
    }

    #[test]
    fn test_parse_classifies_request() {
        let raw = r#"{"jsonrpc":"2.0","id":4,"method":"execute_tool","params":{"namespace":"math","name":"add","args":{"a":1,"b":2}}}"#;
        match Frame::parse(raw).unwrap() {
            Frame::Request(req) => {
                assert_eq!(req.method, "execute_tool");
                assert_eq!(req.id, RpcId::Number(4));
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_classifies_notification() {
        let raw = r#"{"jsonrpc":"2.0","method":"session_created","params":{"session_id":"abc-123"}}"#;
        match Frame::parse(raw).unwrap() {
            Frame::Notification(n) => assert_eq!(n.method, "session_created"),
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_classifies_response() {
        let raw = r#"{"jsonrpc":"2.0","id":"req-9","result":{"success":true}}"#;
        match Frame::parse(raw).unwrap() {
            Frame::Response(resp) => {
                assert_eq!(resp.id, RpcId::String("req-9".to_string()));
                assert_eq!(resp.result["success"], true);
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_classifies_error_reply() {
        let raw = r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"Method not found"}}"#;
        match Frame::parse(raw).unwrap() {
            Frame::Error(err) => {
                assert_eq!(err.error.code, error_codes::METHOD_NOT_FOUND);
                assert_eq!(err.error.message, "Method not found");
                assert!(err.error.data.is_none());
            }
            other => panic!("expected error reply, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Frame::parse("not json at all"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            Frame::parse(r#"{"jsonrpc":"2.0"}"#),
            Err(DecodeError::InvalidEnvelope)
        ));
        assert!(matches!(
            Frame::parse(r#"[1,2,3]"#),
            Err(DecodeError::InvalidEnvelope)
        ));
    }

    #[test]
    fn test_error_response_constructor() {
        let err = ErrorResponse::new(RpcId::Number(3), error_codes::INVALID_PARAMS, "bad args");
        let json = serde_json::to_string(&err).unwrap();
        let parsed = match Frame::parse(&json).unwrap() {
            Frame::Error(e) => e,
            other => panic!("expected error reply, got {:?}", other),
        };
        assert_eq!(parsed.error.code, -32602);
        assert!(!json.contains("data"));
    }

    #[test]
    fn test_rpc_id_number() {
        let id = RpcId::Number(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let parsed: RpcId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RpcId::Number(42));
    }

    #[test]
    fn test_rpc_id_string() {
        let id = RpcId::String("req-1".to_string());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"req-1\"");
        let parsed: RpcId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RpcId::String("req-1".to_string()));
    }

    #[test]
    fn test_frame_id_accessor() {
        let req = Frame::parse(r#"{"jsonrpc":"2.0","id":1,"method":"x"}"#).unwrap();
        assert_eq!(req.id(), Some(&RpcId::Number(1)));

        let notif = Frame::parse(r#"{"jsonrpc":"2.0","method":"session_created"}"#).unwrap();
        assert_eq!(notif.id(), None);
    }
}
