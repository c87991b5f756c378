//! Lookout CLI - terminal client for error-monitoring issue streams

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = lookout_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
