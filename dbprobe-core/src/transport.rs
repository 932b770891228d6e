use std::fmt;
use std::time::Duration;

use log::debug;
use serde_json::Value as JsonValue;

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// Fixed request id reused for every call. Calls are strictly sequential and
/// never overlap, so no correlation is needed.
pub const REQUEST_ID: u64 = 1;

/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default endpoint probed when no URL is given.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/mcp";

/// Transport abstraction for JSON-RPC request/response exchange.
pub trait Transport {
    /// Sends a JSON-RPC request and returns the raw JSON response.
    fn send(&mut self, request: JsonValue) -> Result<JsonValue, TransportError>;
}

/// Transport-level error surfaced by the tool client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportError {
    /// Human-readable error description.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Configuration for an HTTP JSON-RPC endpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HttpConfig {
    /// The HTTP endpoint URL requests are posted to.
    pub url: String,
}

impl HttpConfig {
    /// Creates an HTTP configuration for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

/// Blocking HTTP transport posting one JSON-RPC envelope per call.
///
/// Every failure class — connection errors, non-success HTTP statuses, and
/// undecodable bodies — is reported as a [`TransportError`] with a
/// human-readable message. There are no retries; a failed call is terminal
/// for that call only.
pub struct HttpTransport {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds a transport for the configured endpoint with the fixed
    /// per-request timeout.
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|error| TransportError::new(format!("failed to build http client: {error}")))?;
        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    /// The endpoint URL this transport posts to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, request: JsonValue) -> Result<JsonValue, TransportError> {
        debug!("POST {}: {request}", self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .map_err(|error| TransportError::new(format!("request failed: {error}")))?;
        let response = response
            .error_for_status()
            .map_err(|error| TransportError::new(format!("http error: {error}")))?;
        response
            .json::<JsonValue>()
            .map_err(|error| TransportError::new(format!("json decode error: {error}")))
    }
}
