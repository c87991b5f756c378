//! # Configuration
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Global settings, token | TOML | `{config dir}/config.toml` |
//! | Workspace settings | TOML | `.lookout/config.toml` |
//!
//! Environment (`LOOKOUT_URL`, `LOOKOUT_ORG`, `LOOKOUT_AUTH_TOKEN`) and
//! flags override both files.

mod settings;
mod workspace;

pub use settings::{
    redact, Config, ConfigError, Effective, GlobalConfig, OutputFormat, Overrides, WorkspaceConfig,
    DEFAULT_URL, WORKSPACE_DIR,
};
pub use workspace::{Workspace, WorkspaceError};
