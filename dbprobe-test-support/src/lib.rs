//! Shared helpers for dbprobe integration tests: a configurable stub
//! JSON-RPC endpoint served over HTTP, plus canned response builders.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ctor::ctor;
use serde_json::{json, Value as JsonValue};
use tokio::sync::oneshot;

#[ctor]
fn init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .is_test(true)
        .try_init();
}

/// Canned `initialize` result payload.
pub fn init_result() -> JsonValue {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {},
        "serverInfo": {"name": "stub-mcp", "version": "0.0.1"},
    })
}

/// Wraps a result payload in a JSON-RPC response envelope.
pub fn rpc_result(id: JsonValue, result: JsonValue) -> JsonValue {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

/// Wraps an error payload in a JSON-RPC response envelope.
pub fn rpc_error(id: JsonValue, code: i64, message: &str) -> JsonValue {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

/// A text content item as servers embed them in tool results.
pub fn text_content(text: &str) -> JsonValue {
    json!({"type": "text", "text": text})
}

/// A successful tool result wrapping the given content items.
pub fn tool_result(content: Vec<JsonValue>) -> JsonValue {
    json!({"content": content})
}

/// A failed tool result with `isError` set and one text item.
pub fn tool_error(text: &str) -> JsonValue {
    json!({"isError": true, "content": [text_content(text)]})
}

/// Configurable stub MCP endpoint: an advertised tool catalog, canned
/// per-tool call results, and a log of every received request payload.
#[derive(Clone, Default)]
pub struct StubMcp {
    tools: Vec<(String, String)>,
    responses: HashMap<String, JsonValue>,
    requests: Arc<Mutex<Vec<JsonValue>>>,
}

impl StubMcp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool to the advertised catalog.
    pub fn with_tool(mut self, name: &str, description: &str) -> Self {
        self.tools.push((name.to_string(), description.to_string()));
        self
    }

    /// Sets the canned `tools/call` result for a tool.
    pub fn with_response(mut self, tool: &str, result: JsonValue) -> Self {
        self.responses.insert(tool.to_string(), result);
        self
    }

    /// Handle on the request log; take it before [`StubMcp::router`]
    /// consumes the stub.
    pub fn request_log(&self) -> Arc<Mutex<Vec<JsonValue>>> {
        Arc::clone(&self.requests)
    }

    /// Builds the axum router serving this stub on `POST /mcp`.
    pub fn router(self) -> Router {
        let stub = Arc::new(self);
        Router::new().route("/mcp", post(handle)).with_state(stub)
    }
}

async fn handle(
    State(stub): State<Arc<StubMcp>>,
    Json(payload): Json<JsonValue>,
) -> Json<JsonValue> {
    if let Ok(mut requests) = stub.requests.lock() {
        requests.push(payload.clone());
    }
    let id = payload.get("id").cloned().unwrap_or(JsonValue::Null);
    let method = payload
        .get("method")
        .and_then(JsonValue::as_str)
        .unwrap_or_default();
    let response = match method {
        "initialize" => rpc_result(id, init_result()),
        "tools/list" => {
            let tools: Vec<JsonValue> = stub
                .tools
                .iter()
                .map(|(name, description)| json!({"name": name, "description": description}))
                .collect();
            rpc_result(id, json!({"tools": tools}))
        }
        "tools/call" => {
            let name = payload
                .pointer("/params/name")
                .and_then(JsonValue::as_str)
                .unwrap_or_default();
            match stub.responses.get(name) {
                Some(result) => rpc_result(id, result.clone()),
                None => rpc_error(id, -32602, &format!("unknown tool: {name}")),
            }
        }
        other => rpc_error(id, -32601, &format!("unknown method: {other}")),
    };
    Json(response)
}

/// A stub endpoint bound to an ephemeral local port on a private runtime,
/// so blocking clients can be driven from plain `#[test]` functions.
///
/// Shuts down gracefully on drop.
pub struct StubServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    runtime: Option<tokio::runtime::Runtime>,
}

impl StubServer {
    /// Spawns the router on `127.0.0.1:0`.
    pub fn spawn(router: Router) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("build runtime");
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        runtime.spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        Self {
            addr,
            shutdown: Some(shutdown_tx),
            runtime: Some(runtime),
        }
    }

    /// The endpoint URL clients should post to.
    pub fn url(&self) -> String {
        format!("http://{}/mcp", self.addr)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
