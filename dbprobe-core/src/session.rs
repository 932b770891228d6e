//! Tool invocation over a JSON-RPC transport.

use std::fmt;

use log::info;
use serde_json::{json, Value as JsonValue};

use crate::transport::{Transport, JSONRPC_VERSION, REQUEST_ID};
use crate::{TestResult, ToolInfo};

/// Protocol version sent during the initialize handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Client name reported to the server during initialization.
pub const CLIENT_NAME: &str = "dbprobe";

/// Errors emitted by the tool client.
///
/// Only the handshake stages can fail as Rust errors; tool invocations
/// always come back as a classified [`TestResult`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionError {
    /// The initialize handshake failed.
    InitializationFailed {
        /// Server- or transport-reported reason.
        reason: String,
    },
    /// The tool catalog could not be fetched or decoded.
    ListToolsFailed {
        /// Server- or transport-reported reason.
        reason: String,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InitializationFailed { reason } => {
                write!(f, "failed to initialize server: {reason}")
            }
            SessionError::ListToolsFailed { reason } => {
                write!(f, "failed to list tools: {reason}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Issues JSON-RPC calls through a [`Transport`] and classifies outcomes.
pub struct ToolClient<T: Transport> {
    transport: T,
}

impl<T: Transport> ToolClient<T> {
    /// Creates a client over the provided transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Sends a JSON-RPC request and returns the decoded response body.
    ///
    /// Transport failures are folded into an `error`-keyed mapping, so the
    /// caller always deals with a single response shape and never sees a
    /// propagated fault.
    pub fn send_request(&mut self, method: &str, params: JsonValue) -> JsonValue {
        let request = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": REQUEST_ID,
            "method": method,
            "params": params,
        });
        match self.transport.send(request) {
            Ok(response) => response,
            Err(error) => json!({ "error": error.message }),
        }
    }

    /// Performs the initialize handshake with the fixed protocol version and
    /// client identity.
    pub fn initialize(&mut self) -> Result<JsonValue, SessionError> {
        let response = self.send_request(
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": CLIENT_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        );
        if let Some(reason) = error_text(&response) {
            return Err(SessionError::InitializationFailed { reason });
        }
        if response.get("result").is_none() {
            return Err(SessionError::InitializationFailed {
                reason: format!("unexpected response: {response}"),
            });
        }
        if let Some(identity) = server_identity(&response) {
            info!("server identified as {identity}");
        }
        Ok(response)
    }

    /// Fetches the advertised tool catalog.
    ///
    /// An empty catalog is not an error here; whether that is fatal is the
    /// caller's decision.
    pub fn list_tools(&mut self) -> Result<Vec<ToolInfo>, SessionError> {
        let response = self.send_request("tools/list", json!({}));
        if let Some(reason) = error_text(&response) {
            return Err(SessionError::ListToolsFailed { reason });
        }
        let Some(tools) = response.pointer("/result/tools") else {
            return Err(SessionError::ListToolsFailed {
                reason: format!("unexpected response: {response}"),
            });
        };
        serde_json::from_value(tools.clone()).map_err(|error| SessionError::ListToolsFailed {
            reason: format!("malformed tool catalog: {error}"),
        })
    }

    /// Invokes a tool and classifies the outcome.
    ///
    /// Never fails: transport faults, in-band `isError` results, and
    /// unrecognized response shapes all come back as a failed [`TestResult`].
    pub fn call_tool(&mut self, tool_name: &str, arguments: JsonValue) -> TestResult {
        let response = self.send_request(
            "tools/call",
            json!({
                "name": tool_name,
                "arguments": arguments,
            }),
        );
        if let Some(error) = error_text(&response) {
            return TestResult {
                tool_name: tool_name.to_string(),
                success: false,
                response,
                error,
            };
        }
        if let Some(result) = response.get("result") {
            let is_error = result
                .get("isError")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            let error = if is_error {
                first_content_text(result).to_string()
            } else {
                String::new()
            };
            return TestResult {
                tool_name: tool_name.to_string(),
                success: !is_error,
                response,
                error,
            };
        }
        TestResult {
            tool_name: tool_name.to_string(),
            success: false,
            response,
            error: "unexpected response format".to_string(),
        }
    }
}

fn error_text(response: &JsonValue) -> Option<String> {
    response.get("error").map(|error| match error {
        JsonValue::String(message) => message.clone(),
        other => other.to_string(),
    })
}

/// First content item's `text` field; empty when content is missing or empty.
fn first_content_text(result: &JsonValue) -> &str {
    result
        .get("content")
        .and_then(|content| content.get(0))
        .and_then(|item| item.get("text"))
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
}

fn server_identity(response: &JsonValue) -> Option<String> {
    let info = response.pointer("/result/serverInfo")?;
    let name = info.get("name").and_then(JsonValue::as_str)?;
    match info.get("version").and_then(JsonValue::as_str) {
        Some(version) => Some(format!("{name} {version}")),
        None => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::transport::TransportError;
    use serde_json::json;

    struct RecordingTransport {
        requests: Vec<JsonValue>,
        responses: VecDeque<JsonValue>,
    }

    impl RecordingTransport {
        fn new(responses: Vec<JsonValue>) -> Self {
            Self {
                requests: Vec::new(),
                responses: VecDeque::from(responses),
            }
        }
    }

    impl Transport for RecordingTransport {
        fn send(&mut self, request: JsonValue) -> Result<JsonValue, TransportError> {
            self.requests.push(request);
            self.responses
                .pop_front()
                .ok_or_else(|| TransportError::new("missing response"))
        }
    }

    struct QueueTransport {
        responses: VecDeque<Result<JsonValue, TransportError>>,
    }

    impl QueueTransport {
        fn new(responses: Vec<Result<JsonValue, TransportError>>) -> Self {
            Self {
                responses: VecDeque::from(responses),
            }
        }
    }

    impl Transport for QueueTransport {
        fn send(&mut self, _request: JsonValue) -> Result<JsonValue, TransportError> {
            self.responses
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::new("missing response")))
        }
    }

    #[test]
    fn send_request_builds_fixed_id_envelope() {
        let transport = RecordingTransport::new(vec![json!({"result": {}})]);
        let mut client = ToolClient::new(transport);

        client.send_request("tools/call", json!({"name": "echo", "arguments": {"a": 1}}));

        let request = &client.transport.requests[0];
        assert_eq!(request.get("jsonrpc"), Some(&json!("2.0")));
        assert_eq!(request.get("id"), Some(&json!(1)));
        assert_eq!(request.get("method"), Some(&json!("tools/call")));
        assert_eq!(
            request.pointer("/params/name").and_then(JsonValue::as_str),
            Some("echo")
        );
        assert_eq!(request.pointer("/params/arguments/a"), Some(&json!(1)));
    }

    #[test]
    fn send_request_folds_transport_error_into_mapping() {
        let transport = QueueTransport::new(vec![Err(TransportError::new("wire down"))]);
        let mut client = ToolClient::new(transport);

        let response = client.send_request("tools/list", json!({}));
        assert_eq!(response, json!({"error": "wire down"}));
    }

    #[test]
    fn call_tool_marks_plain_result_successful() {
        let transport = RecordingTransport::new(vec![json!({
            "result": {"content": [{"type": "text", "text": "ok"}]}
        })]);
        let mut client = ToolClient::new(transport);

        let result = client.call_tool("list_connections", json!({}));
        assert!(result.success);
        assert!(result.error.is_empty());
        assert_eq!(result.tool_name, "list_connections");
    }

    #[test]
    fn call_tool_reads_error_text_from_first_content_item() {
        let transport = RecordingTransport::new(vec![json!({
            "result": {
                "isError": true,
                "content": [
                    {"type": "text", "text": "connection refused"},
                    {"type": "text", "text": "second entry ignored"},
                ],
            }
        })]);
        let mut client = ToolClient::new(transport);

        let result = client.call_tool("list_databases", json!({"connection": "prod"}));
        assert!(!result.success);
        assert_eq!(result.error, "connection refused");
    }

    #[test]
    fn call_tool_with_error_flag_and_empty_content_yields_empty_error() {
        let transport = RecordingTransport::new(vec![json!({
            "result": {"isError": true, "content": []}
        })]);
        let mut client = ToolClient::new(transport);

        let result = client.call_tool("describe_table", json!({}));
        assert!(!result.success);
        assert_eq!(result.error, "");
    }

    #[test]
    fn call_tool_with_error_flag_and_missing_content_yields_empty_error() {
        let transport = RecordingTransport::new(vec![json!({
            "result": {"isError": true}
        })]);
        let mut client = ToolClient::new(transport);

        let result = client.call_tool("describe_table", json!({}));
        assert!(!result.success);
        assert_eq!(result.error, "");
    }

    #[test]
    fn call_tool_reports_transport_failure_as_failed_result() {
        let transport = QueueTransport::new(vec![Err(TransportError::new("connect timeout"))]);
        let mut client = ToolClient::new(transport);

        let result = client.call_tool("get_pool_metrics", json!({}));
        assert!(!result.success);
        assert_eq!(result.error, "connect timeout");
        assert_eq!(result.response, json!({"error": "connect timeout"}));
    }

    #[test]
    fn call_tool_stringifies_structured_error_objects() {
        let transport = RecordingTransport::new(vec![json!({
            "error": {"code": -32601, "message": "method not found"}
        })]);
        let mut client = ToolClient::new(transport);

        let result = client.call_tool("bogus_tool", json!({}));
        assert!(!result.success);
        assert!(result.error.contains("method not found"));
    }

    #[test]
    fn call_tool_flags_unexpected_response_shape() {
        let transport = RecordingTransport::new(vec![json!({"status": "weird"})]);
        let mut client = ToolClient::new(transport);

        let result = client.call_tool("list_connections", json!({}));
        assert!(!result.success);
        assert_eq!(result.error, "unexpected response format");
    }

    #[test]
    fn initialize_sends_protocol_version_and_identity() {
        let transport = RecordingTransport::new(vec![json!({"result": {}})]);
        let mut client = ToolClient::new(transport);

        client.initialize().expect("init");

        let request = &client.transport.requests[0];
        assert_eq!(request.get("method"), Some(&json!("initialize")));
        assert_eq!(
            request
                .pointer("/params/protocolVersion")
                .and_then(JsonValue::as_str),
            Some(PROTOCOL_VERSION)
        );
        assert_eq!(
            request
                .pointer("/params/clientInfo/name")
                .and_then(JsonValue::as_str),
            Some(CLIENT_NAME)
        );
    }

    #[test]
    fn initialize_error_surfaces_reason() {
        let transport = RecordingTransport::new(vec![json!({"error": "HTTP Error 500"})]);
        let mut client = ToolClient::new(transport);

        let error = client.initialize().expect_err("init failure");
        assert_eq!(
            error,
            SessionError::InitializationFailed {
                reason: "HTTP Error 500".to_string()
            }
        );
    }

    #[test]
    fn initialize_rejects_shape_without_result() {
        let transport = RecordingTransport::new(vec![json!({"status": "weird"})]);
        let mut client = ToolClient::new(transport);

        let error = client.initialize().expect_err("init failure");
        assert!(matches!(
            error,
            SessionError::InitializationFailed { reason } if reason.contains("unexpected response")
        ));
    }

    #[test]
    fn list_tools_decodes_catalog() {
        let transport = RecordingTransport::new(vec![json!({
            "result": {"tools": [
                {"name": "list_connections", "description": "List configured connections"},
                {"name": "get_pool_metrics"},
            ]}
        })]);
        let mut client = ToolClient::new(transport);

        let tools = client.list_tools().expect("tools");
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "list_connections");
        assert_eq!(tools[1].description, "");
    }

    #[test]
    fn list_tools_propagates_transport_error() {
        let transport = QueueTransport::new(vec![Err(TransportError::new("wire down"))]);
        let mut client = ToolClient::new(transport);

        let error = client.list_tools().expect_err("list failure");
        assert_eq!(
            error,
            SessionError::ListToolsFailed {
                reason: "wire down".to_string()
            }
        );
    }

    #[test]
    fn list_tools_rejects_missing_catalog() {
        let transport = RecordingTransport::new(vec![json!({"result": {}})]);
        let mut client = ToolClient::new(transport);

        let error = client.list_tools().expect_err("list failure");
        assert!(matches!(error, SessionError::ListToolsFailed { .. }));
    }

    #[test]
    fn call_tool_is_pure_given_the_response() {
        let response = json!({
            "result": {"content": [{"type": "text", "text": "[]"}]}
        });
        let transport = RecordingTransport::new(vec![response.clone(), response.clone()]);
        let mut client = ToolClient::new(transport);

        let first = client.call_tool("list_connections", json!({}));
        let second = client.call_tool("list_connections", json!({}));
        assert_eq!(first.success, second.success);
        assert_eq!(first.response, second.response);
    }
}
