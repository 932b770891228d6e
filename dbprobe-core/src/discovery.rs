//! The discovery test sequence: connections → databases → tables → details.

use std::fmt;

use log::{info, warn};
use serde_json::{json, Value as JsonValue};

use crate::session::{SessionError, ToolClient};
use crate::transport::Transport;
use crate::{extract, ConnectionInfo, TestResult};

/// Row limit for `get_table_sample` probes.
pub const SAMPLE_ROW_LIMIT: u64 = 5;

/// Fatal conditions that abort a discovery run before any summary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunError {
    /// The initialize handshake failed.
    InitializationFailed {
        /// Server- or transport-reported reason.
        reason: String,
    },
    /// The tool catalog is empty or could not be fetched.
    NoToolsAvailable {
        /// Why the catalog is unusable.
        reason: String,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::InitializationFailed { reason } => {
                write!(f, "failed to initialize server: {reason}")
            }
            RunError::NoToolsAvailable { reason } => {
                write!(f, "no tools available: {reason}")
            }
        }
    }
}

impl std::error::Error for RunError {}

impl From<SessionError> for RunError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::InitializationFailed { reason } => {
                RunError::InitializationFailed { reason }
            }
            SessionError::ListToolsFailed { reason } => RunError::NoToolsAvailable { reason },
        }
    }
}

/// Drives the fixed discovery sequence against one endpoint.
///
/// A strictly linear, single-pass stage machine: each stage either advances
/// on the previous stage's extracted data or short-circuits to the summary.
/// Only initialization failures and an unusable tool catalog are fatal.
pub struct DiscoveryRunner<T: Transport> {
    client: ToolClient<T>,
    results: Vec<TestResult>,
}

impl<T: Transport> DiscoveryRunner<T> {
    /// Creates a runner over the provided client.
    pub fn new(client: ToolClient<T>) -> Self {
        Self {
            client,
            results: Vec::new(),
        }
    }

    /// Runs the discovery sequence, returning the accumulated results in
    /// invocation order for summary reporting.
    pub fn run(mut self) -> Result<Vec<TestResult>, RunError> {
        self.client.initialize()?;
        info!("server initialized");

        let tools = self.client.list_tools()?;
        if tools.is_empty() {
            return Err(RunError::NoToolsAvailable {
                reason: "server advertises an empty tool catalog".to_string(),
            });
        }
        info!("found {} tools", tools.len());
        for tool in &tools {
            info!("  - {}: {}", tool.name, tool.description);
        }

        self.probe_connections();
        Ok(self.results)
    }

    fn probe_connections(&mut self) {
        info!("testing basic tools");
        let connections_result = self.call("list_connections", json!({}));
        self.call("get_pool_metrics", json!({}));
        self.call("get_connection_status", json!({}));

        let connections = extract::connections(&connections_result);
        let Some(connection) = connections.first() else {
            warn!("no connections found, skipping database probes");
            return;
        };
        info!("found {} connections", connections.len());

        // Only the first connection is probed. Deliberate request-volume
        // control; keep it a single probe, not a loop.
        let connection = connection.clone();
        self.probe_connection(&connection);
    }

    fn probe_connection(&mut self, connection: &ConnectionInfo) {
        info!(
            "testing connection '{}' (type: {})",
            connection.name, connection.kind
        );
        let databases_result = self.call(
            "list_databases",
            json!({"connection": connection.name}),
        );
        self.call(
            "get_connection_status",
            json!({"connection": connection.name}),
        );

        if !databases_result.success {
            warn!(
                "failed to list databases for '{}': {}",
                connection.name, databases_result.error
            );
            return;
        }
        let databases = extract::databases(&databases_result);
        let Some(database) = databases.first() else {
            warn!("no databases found for '{}'", connection.name);
            return;
        };
        let database = database.clone();
        self.probe_database(connection, &database);
    }

    fn probe_database(&mut self, connection: &ConnectionInfo, database: &str) {
        info!("testing database '{database}'");
        let schema = self.select_schema(connection, database);

        let mut arguments = json!({
            "connection": connection.name,
            "database": database,
        });
        if let Some(schema) = &schema {
            arguments["schema"] = json!(schema);
        }
        let tables_result = self.call("list_tables", arguments);
        if !tables_result.success {
            warn!(
                "failed to list tables in '{database}': {}",
                tables_result.error
            );
            return;
        }
        let tables = extract::tables(&tables_result);
        let Some(table) = tables.first() else {
            warn!("no tables found in '{database}'");
            return;
        };
        let table = table.clone();
        self.probe_table(connection, database, schema.as_deref(), &table);
    }

    /// PostgreSQL connections get a schema probe first; the first reported
    /// schema wins, falling back to `public`.
    fn select_schema(&mut self, connection: &ConnectionInfo, database: &str) -> Option<String> {
        if connection.kind != "postgres" {
            return None;
        }
        let schemas_result = self.call(
            "list_schemas",
            json!({
                "connection": connection.name,
                "database": database,
            }),
        );
        // Schema listings use the same response shapes as database listings.
        let schemas = extract::databases(&schemas_result);
        Some(
            schemas
                .into_iter()
                .next()
                .unwrap_or_else(|| "public".to_string()),
        )
    }

    fn probe_table(
        &mut self,
        connection: &ConnectionInfo,
        database: &str,
        schema: Option<&str>,
        table: &str,
    ) {
        info!("testing table '{table}'");
        let mut arguments = json!({
            "connection": connection.name,
            "database": database,
            "table": table,
        });
        if let Some(schema) = schema {
            arguments["schema"] = json!(schema);
        }
        self.call("describe_table", arguments.clone());
        self.call("list_indexes", arguments.clone());
        arguments["limit"] = json!(SAMPLE_ROW_LIMIT);
        self.call("get_table_sample", arguments);
    }

    fn call(&mut self, tool_name: &str, arguments: JsonValue) -> TestResult {
        let result = self.client.call_tool(tool_name, arguments);
        if result.success {
            info!("{tool_name}: ok");
        } else {
            warn!("{tool_name}: failed: {}", result.error);
        }
        self.results.push(result.clone());
        result
    }
}
