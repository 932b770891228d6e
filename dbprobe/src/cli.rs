use clap::Parser;
use dbprobe_core::DEFAULT_ENDPOINT;

#[derive(Parser)]
#[command(
    name = "dbprobe",
    version,
    about = "Diagnostic harness for database MCP endpoints"
)]
pub struct Cli {
    /// MCP server URL.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub url: String,
    /// Invoke a single tool with empty arguments instead of the discovery run.
    #[arg(long, value_name = "NAME")]
    pub tool: Option<String>,
    /// Emit JSON output instead of human-readable output.
    #[arg(long)]
    pub json: bool,
}
