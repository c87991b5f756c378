//! Views rendered by CLI commands
//!
//! Each view implements [`AsyncView`](crate::controller::AsyncView) and
//! renders a [`Screen`]: text lines for the terminal plus the same content as
//! JSON for `--format json`.

mod issue_details;
mod issue_list;

use anyhow::Result;

use super::output::Output;
use crate::controller::{AsyncController, AsyncView, FetchState, Phase};

pub use issue_details::IssueDetailsView;
pub use issue_list::{IssueListView, SAVED_SEARCHES};

/// A rendered view
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub lines: Vec<String>,
    pub data: serde_json::Value,

    /// The whole view failed to load
    pub failed: bool,
}

impl Screen {
    pub fn loading() -> Self {
        Self {
            lines: vec!["Loading...".to_string()],
            data: serde_json::json!({ "loading": true }),
            failed: false,
        }
    }

    /// Whole-view error built from every failed endpoint
    pub fn error(what: &str, state: &FetchState) -> Self {
        let errors: serde_json::Map<String, serde_json::Value> = state
            .errors()
            .map(|(key, e)| (key.to_string(), serde_json::Value::String(e.to_string())))
            .collect();
        // A critical failure explains the whole view best
        let reason = state
            .errors()
            .find(|(key, _)| state.is_critical(key))
            .or_else(|| state.errors().next())
            .map(|(_, e)| e.detail().map(str::to_string).unwrap_or_else(|| e.to_string()))
            .unwrap_or_else(|| "unknown error".to_string());

        Self {
            lines: vec![format!("Failed to load {}: {}", what, reason)],
            data: serde_json::json!({ "errors": errors }),
            failed: true,
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Marker shown in place of a section whose endpoint failed
pub fn failed_section(name: &str) -> String {
    format!("  [failed to load {}]", name)
}

/// Fetches a view's endpoints and waits for all of them to settle
pub async fn load<V: AsyncView>(controller: &AsyncController, view: &V) -> FetchState {
    controller.mount(view.endpoints());
    controller.settled().await;
    controller.state()
}

/// Prints a screen; a failed screen becomes the command's error
pub fn present(output: &Output, state: &FetchState, screen: Screen) -> Result<()> {
    if screen.failed || state.phase() == Phase::Error {
        anyhow::bail!("{}", screen.text());
    }
    if output.is_json() {
        output.data(&screen.data);
    } else {
        output.lines(&screen.lines);
    }
    Ok(())
}
