//! Pass/fail summary rendering for a completed run.

use serde::{Deserialize, Serialize};

use crate::TestResult;

/// Serializable summary of a discovery run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of successful tool calls.
    pub passed: usize,
    /// Number of failed tool calls.
    pub failed: usize,
    /// Every result in invocation order.
    pub results: Vec<TestResult>,
}

impl RunReport {
    /// Builds a report, counting passes and failures.
    pub fn new(results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|result| result.success).count();
        let failed = results.len() - passed;
        Self {
            passed,
            failed,
            results,
        }
    }
}

/// Formats the human-readable summary: overall counts, then each result by
/// tool name, with error text for failures.
pub fn format_summary(results: &[TestResult]) -> String {
    let passed: Vec<&TestResult> = results.iter().filter(|result| result.success).collect();
    let failed: Vec<&TestResult> = results.iter().filter(|result| !result.success).collect();

    let mut output = String::new();
    output.push_str("Test summary\n");
    output.push_str(&format!(
        "Overall: {}/{} tests passed\n",
        passed.len(),
        results.len()
    ));
    if !passed.is_empty() {
        output.push_str(&format!("Passed ({}):\n", passed.len()));
        for result in &passed {
            output.push_str(&format!("  - {}\n", result.tool_name));
        }
    }
    if !failed.is_empty() {
        output.push_str(&format!("Failed ({}):\n", failed.len()));
        for result in &failed {
            output.push_str(&format!("  - {}: {}\n", result.tool_name, result.error));
        }
    }
    output
}
