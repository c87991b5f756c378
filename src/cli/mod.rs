//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Workspace and settings | `init`, `config show` |
//! | Issues | Stream, details and triage | `issues list`, `issues show`, `issues resolve` |
//! | Notes | Issue discussion | `issues note add`, `issues note rm` |
//! | Guides | Onboarding panel | `guides show`, `guides dismiss` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Offline Use
//!
//! `--replay <file>` answers every API request from a fixture file; see
//! [`ReplayTransport`](crate::api::ReplayTransport) for the format.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr, or set `LOOKOUT_LOG`
//! to any `tracing` filter:
//! ```bash
//! LOOKOUT_LOG=lookout_cli=trace lookout issues list
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod config_cmd;
mod guides;
mod issues;
mod output;
mod session;
pub mod views;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use session::Session;
