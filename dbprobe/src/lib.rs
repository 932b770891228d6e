use std::process::ExitCode;

use log::info;
use serde_json::json;

use dbprobe_core::{
    format_summary, DiscoveryRunner, HttpConfig, HttpTransport, RunReport, ToolClient,
};

mod cli;
mod output;

pub use cli::Cli;
use output::{error_exit, failure_exit};

pub fn run(cli: Cli) -> ExitCode {
    let config = HttpConfig::new(&cli.url);
    let transport = match HttpTransport::new(&config) {
        Ok(transport) => transport,
        Err(error) => return error_exit(&error.to_string(), cli.json),
    };
    let client = ToolClient::new(transport);
    match &cli.tool {
        Some(tool) => run_single_tool(client, tool, cli.json),
        None => run_discovery(client, cli.json),
    }
}

/// Ad-hoc mode: initialize, invoke one tool with empty arguments, and print
/// the raw response on success.
fn run_single_tool(
    mut client: ToolClient<HttpTransport>,
    tool: &str,
    json_output: bool,
) -> ExitCode {
    info!("testing tool '{tool}'");
    if let Err(error) = client.initialize() {
        return failure_exit(&error.to_string(), json_output);
    }
    let result = client.call_tool(tool, json!({}));
    if !result.success {
        return failure_exit(&format!("{tool} failed: {}", result.error), json_output);
    }
    let payload = serde_json::to_string_pretty(&result.response)
        .unwrap_or_else(|_| result.response.to_string());
    println!("{payload}");
    ExitCode::SUCCESS
}

fn run_discovery(client: ToolClient<HttpTransport>, json_output: bool) -> ExitCode {
    info!("starting comprehensive tool test");
    let runner = DiscoveryRunner::new(client);
    let results = match runner.run() {
        Ok(results) => results,
        Err(error) => return failure_exit(&error.to_string(), json_output),
    };
    let report = RunReport::new(results);
    if json_output {
        let payload = serde_json::to_string_pretty(&report)
            .unwrap_or_else(|_| "<failed to serialize report>".to_string());
        println!("{payload}");
    } else {
        print!("{}", format_summary(&report.results));
    }
    ExitCode::SUCCESS
}
