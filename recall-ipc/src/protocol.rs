//! JSON-RPC 2.0 wire types: one object per newline-delimited line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32000;
pub const MAX_CLIENTS_EXCEEDED: i64 = -32001;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    /// Requests with no `id` are notifications: no response is sent.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// `service.method` split on the first dot.
    #[must_use]
    pub fn split_method(&self) -> Option<(&str, &str)> {
        self.method.split_once('.')
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn method_not_found(service: &str, method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("method not found: {service}.{method}")).with_data(
            serde_json::json!({ "service": service, "method": method }),
        )
    }

    #[must_use]
    pub fn unknown_service(service: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("unknown service: {service}"))
            .with_data(serde_json::json!({ "service": service }))
    }

    #[must_use]
    pub fn from_handler(service: &str, method: &str, err: &recall_core::Error) -> Self {
        Self::new(err.rpc_code(), err.to_string()).with_data(
            serde_json::json!({ "service": service, "method": method }),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A server-initiated message that is not a response to any particular
/// request (e.g. the shutdown notice sent during `stopping`).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl JsonRpcNotification {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// Result of parsing one newline-delimited line: either a single request, or
/// a batch of still-raw JSON values (each element is parsed individually by
/// [`parse_value`] so one malformed element doesn't fail the whole batch).
#[derive(Debug)]
pub enum ParsedLine {
    Single(JsonRpcRequest),
    Batch(Vec<Value>),
}

/// Parse one newline-delimited JSON-RPC line. Distinguishes malformed JSON
/// (`-32700`) from structurally valid-but-invalid requests (`-32600`).
pub fn parse_line(line: &str) -> Result<ParsedLine, JsonRpcError> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| JsonRpcError::new(PARSE_ERROR, format!("parse error: {e}")))?;
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(JsonRpcError::new(INVALID_REQUEST, "batch request must not be empty"));
            }
            Ok(ParsedLine::Batch(items))
        }
        Value::Object(_) => parse_value(value).map(ParsedLine::Single),
        _ => Err(JsonRpcError::new(INVALID_REQUEST, "request must be a JSON object or array")),
    }
}

/// Parse one already-decoded JSON value (a whole line, or one batch element)
/// into a request.
pub fn parse_value(value: Value) -> Result<JsonRpcRequest, JsonRpcError> {
    if !value.is_object() {
        return Err(JsonRpcError::new(INVALID_REQUEST, "request must be a JSON object"));
    }
    serde_json::from_value(value)
        .map_err(|e| JsonRpcError::new(INVALID_REQUEST, format!("invalid request: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_line("{not json").unwrap_err();
        assert_eq!(err.code, PARSE_ERROR);
    }

    #[test]
    fn missing_method_is_invalid_request() {
        let err = parse_line(r#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
        assert_eq!(err.code, INVALID_REQUEST);
    }

    #[test]
    fn notification_has_no_id() {
        let ParsedLine::Single(req) = parse_line(r#"{"method":"health.ping"}"#).unwrap() else {
            panic!("expected a single request");
        };
        assert!(req.is_notification());
    }

    #[test]
    fn splits_service_and_method() {
        let ParsedLine::Single(req) = parse_line(r#"{"method":"episode.create","id":1}"#).unwrap() else {
            panic!("expected a single request");
        };
        assert_eq!(req.split_method(), Some(("episode", "create")));
    }

    #[test]
    fn array_is_parsed_as_a_batch() {
        let parsed = parse_line(r#"[{"method":"health.ping","id":1},{"method":"health.ping","id":2}]"#).unwrap();
        let ParsedLine::Batch(items) = parsed else {
            panic!("expected a batch");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn empty_batch_is_invalid_request() {
        let err = parse_line("[]").unwrap_err();
        assert_eq!(err.code, INVALID_REQUEST);
    }
}
