//! JSON-RPC 2.0 envelopes and the MCP requests the harness issues.
//!
//! Messages are newline-delimited: one compact JSON object per line on
//! the child's stdin/stdout.
use serde::Serialize;
use serde_json::{json, Value};

/// The only JSON-RPC version the harness speaks.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision sent in `initialize` unless the caller
/// overrides it.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Identity advertised to the server during the handshake.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        ClientInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// What the server advertised in its `initialize` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerHandshake {
    pub protocol_version: String,
    pub capabilities: Value,
    pub server_info: Value,
}

impl ServerHandshake {
    pub(crate) fn from_result(result: &Value) -> ServerHandshake {
        ServerHandshake {
            protocol_version: result
                .get("protocolVersion")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            capabilities: result.get("capabilities").cloned().unwrap_or(Value::Null),
            server_info: result.get("serverInfo").cloned().unwrap_or(Value::Null),
        }
    }
}

/// An outbound request; `id` correlates the response.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub id: i64,
    pub method: String,
    pub params: Value,
}

impl Request {
    pub fn new(id: i64, method: impl Into<String>, params: Value) -> Request {
        Request {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// An outbound notification; carries no `id` and is never awaited.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Notification {
        Notification {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

pub(crate) fn initialize_request(
    id: i64,
    protocol_version: &str,
    client_info: &ClientInfo,
) -> Request {
    Request::new(
        id,
        "initialize",
        json!({
            "protocolVersion": protocol_version,
            "capabilities": {},
            "clientInfo": client_info,
        }),
    )
}

pub(crate) fn initialized_notification() -> Notification {
    Notification::new("notifications/initialized", json!({}))
}

/// Classification of one framed line from the child's stdout.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Incoming {
    /// A response envelope; `id` is `None` when it is not an integer
    /// (the harness never issues such ids, so it cannot be correlated).
    Response { id: Option<i64>, envelope: Value },
    /// A server-sent notification; accepted, never awaited.
    Notification { method: String },
    /// A server-to-client request (e.g. sampling); not supported,
    /// surfaced to the log only.
    Request { method: String },
    /// Not a JSON-RPC message at all.
    Invalid { reason: String },
}

pub(crate) fn classify(line: &str) -> Incoming {
    let envelope: Value = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(error) => {
            return Incoming::Invalid {
                reason: format!("not valid JSON: {error}"),
            }
        }
    };
    if !envelope.is_object() {
        return Incoming::Invalid {
            reason: "not a JSON object".to_string(),
        };
    }
    let has_id = envelope.get("id").is_some();
    let method = envelope.get("method").and_then(Value::as_str);
    match (method, has_id) {
        (Some(method), true) => Incoming::Request {
            method: method.to_string(),
        },
        (Some(method), false) => Incoming::Notification {
            method: method.to_string(),
        },
        (None, true) => {
            if envelope.get("result").is_some() == envelope.get("error").is_some() {
                return Incoming::Invalid {
                    reason: "response must carry exactly one of result/error".to_string(),
                };
            }
            Incoming::Response {
                id: envelope.get("id").and_then(Value::as_i64),
                envelope,
            }
        }
        (None, false) => Incoming::Invalid {
            reason: "message has neither method nor id".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_serialize_in_wire_order() {
        let request = Request::new(1, "tools/list", json!({}));
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#
        );
    }

    #[test]
    fn initialize_carries_client_identity() {
        let request = initialize_request(
            1,
            DEFAULT_PROTOCOL_VERSION,
            &ClientInfo {
                name: "probe".to_string(),
                version: "0.1.0".to_string(),
            },
        );
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["params"]["protocolVersion"], json!("2024-11-05"));
        assert_eq!(wire["params"]["clientInfo"]["name"], json!("probe"));
    }

    #[test]
    fn classification() {
        assert_eq!(
            classify(r#"{"jsonrpc":"2.0","id":7,"result":{}}"#),
            Incoming::Response {
                id: Some(7),
                envelope: json!({"jsonrpc": "2.0", "id": 7, "result": {}}),
            }
        );
        assert_eq!(
            classify(r#"{"jsonrpc":"2.0","method":"notifications/progress"}"#),
            Incoming::Notification {
                method: "notifications/progress".to_string()
            }
        );
        assert_eq!(
            classify(r#"{"jsonrpc":"2.0","id":1,"method":"sampling/createMessage"}"#),
            Incoming::Request {
                method: "sampling/createMessage".to_string()
            }
        );
        assert!(matches!(classify("garbage"), Incoming::Invalid { .. }));
        assert!(matches!(
            classify(r#"{"id":1}"#),
            Incoming::Invalid { .. }
        ));
        assert!(matches!(
            classify(r#"{"id":1,"result":{},"error":{}}"#),
            Incoming::Invalid { .. }
        ));
    }

    #[test]
    fn handshake_extraction_tolerates_partial_results() {
        let handshake = ServerHandshake::from_result(&json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
        }));
        assert_eq!(handshake.protocol_version, "2024-11-05");
        assert_eq!(handshake.capabilities, json!({"tools": {}}));
        assert_eq!(handshake.server_info, Value::Null);
    }
}
