//! Public API types for configuring and reporting dbprobe discovery runs.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod discovery;
pub mod extract;
pub mod report;
pub mod session;
pub mod transport;

pub use discovery::{DiscoveryRunner, RunError};
pub use report::{format_summary, RunReport};
pub use session::{SessionError, ToolClient};
pub use transport::{HttpConfig, HttpTransport, Transport, TransportError, DEFAULT_ENDPOINT};

/// Outcome of a single tool invocation.
///
/// Immutable after construction; collected in invocation order for the
/// final summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    /// The invoked tool's name.
    pub tool_name: String,
    /// Whether the call succeeded (a `result` without an `isError` flag).
    pub success: bool,
    /// The raw response payload as received.
    pub response: JsonValue,
    /// Error text for failed calls; empty on success.
    #[serde(default)]
    pub error: String,
}

/// A tool advertised by the server's catalog.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name usable with `tools/call`.
    pub name: String,
    /// Human-readable description; empty when the server omits it.
    #[serde(default)]
    pub description: String,
}

/// Connection descriptor extracted from a `list_connections` response.
///
/// Transient; only used to drive subsequent calls within the same run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection name passed back to per-connection tools.
    pub name: String,
    /// Database engine type, e.g. `mysql` or `postgres`.
    #[serde(rename = "type", default = "unknown_kind")]
    pub kind: String,
}

fn unknown_kind() -> String {
    "unknown".to_string()
}
