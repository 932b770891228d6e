use std::process::ExitCode;

use serde::Serialize;

#[derive(Serialize)]
struct CliError<'a> {
    status: &'static str,
    message: &'a str,
}

/// Reports an unusable invocation or setup failure; exit code 2.
pub(super) fn error_exit(message: &str, json: bool) -> ExitCode {
    print_error(message, json);
    ExitCode::from(2)
}

/// Reports a fatal run condition; exit code 1.
pub(super) fn failure_exit(message: &str, json: bool) -> ExitCode {
    print_error(message, json);
    ExitCode::from(1)
}

fn print_error(message: &str, json: bool) {
    if json {
        let payload = CliError {
            status: "error",
            message,
        };
        let output = serde_json::to_string_pretty(&payload).unwrap_or(message.to_string());
        eprintln!("{output}");
    } else {
        eprintln!("{message}");
    }
}
