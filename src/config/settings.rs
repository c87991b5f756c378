//! Configuration handling for lookout
//!
//! Configuration is layered, later layers winning:
//! 1. global file `config.toml` in the platform config directory
//!    (or `$LOOKOUT_CONFIG_DIR`)
//! 2. workspace file `.lookout/config.toml`, found by walking up from the
//!    current directory
//! 3. environment variables and command-line flags

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server used when nothing else is configured
pub const DEFAULT_URL: &str = "http://localhost:9000/";

pub const WORKSPACE_DIR: &str = ".lookout";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Workspace-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Organization slug
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    /// Default project slug
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Server URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl WorkspaceConfig {
    /// Copies every field set in `other` over this one
    pub fn merge(&mut self, other: WorkspaceConfig) {
        if other.org.is_some() {
            self.org = other.org;
        }
        if other.project.is_some() {
            self.project = other.project;
        }
        if other.url.is_some() {
            self.url = other.url;
        }
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Server URL
    pub url: Option<String>,

    /// Organization used outside any workspace
    pub org: Option<String>,

    /// API auth token
    pub token: Option<String>,
}

/// Values from flags and environment, applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub org: Option<String>,
    pub token: Option<String>,
    pub format: Option<OutputFormat>,
}

/// Combined configuration (global + workspace + overrides)
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub global: GlobalConfig,
    pub workspace_root: Option<PathBuf>,
    pub overrides: Overrides,
}

/// The configuration a command actually runs with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Effective {
    pub url: String,
    pub org: Option<String>,
    pub project: Option<String>,
    pub token: Option<String>,
    pub format: OutputFormat,
    pub workspace: Option<PathBuf>,
}

impl Effective {
    /// Same values with the token masked, for display
    pub fn redacted(&self) -> Effective {
        Effective {
            token: self.token.as_deref().map(redact),
            ..self.clone()
        }
    }
}

/// Masks all but the last four characters of a secret
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

impl Config {
    /// Loads configuration from default locations
    pub fn load(overrides: Overrides) -> Result<Self> {
        let global = Self::load_global()?;
        let workspace_root = std::env::current_dir()
            .ok()
            .and_then(|dir| Self::find_workspace_root_from(&dir));
        let workspace = match &workspace_root {
            Some(root) => Self::load_workspace_config(root)?,
            None => WorkspaceConfig::default(),
        };

        Ok(Self {
            workspace,
            global,
            workspace_root,
            overrides,
        })
    }

    /// Loads configuration for a specific workspace
    pub fn for_workspace(root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let workspace = Self::load_workspace_config(root)?;

        Ok(Self {
            workspace,
            global,
            workspace_root: Some(root.to_path_buf()),
            overrides: Overrides::default(),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os("LOOKOUT_CONFIG_DIR") {
            return Some(PathBuf::from(dir));
        }
        ProjectDirs::from("dev", "lookout", "lookout-cli").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    fn load_workspace_config(root: &Path) -> Result<WorkspaceConfig> {
        let config_path = root.join(WORKSPACE_DIR).join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(WorkspaceConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read workspace config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse workspace config")
    }

    /// Finds the workspace root by looking for a `.lookout/` directory
    pub fn find_workspace_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    pub fn is_in_workspace(&self) -> bool {
        self.workspace_root.is_some()
    }

    /// Resolves every layer into the values a command uses
    pub fn effective(&self) -> Result<Effective> {
        let url = self
            .overrides
            .url
            .clone()
            .or_else(|| self.workspace.url.clone())
            .or_else(|| self.global.url.clone())
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        url::Url::parse(&url)
            .map_err(|e| ConfigError::Invalid(format!("url '{}': {}", url, e)))?;

        Ok(Effective {
            url,
            org: self
                .overrides
                .org
                .clone()
                .or_else(|| self.workspace.org.clone())
                .or_else(|| self.global.org.clone()),
            project: self.workspace.project.clone(),
            token: self.overrides.token.clone().or_else(|| self.global.token.clone()),
            format: self.overrides.format.unwrap_or(self.global.default_format),
            workspace: self.workspace_root.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(workspace: WorkspaceConfig, global: GlobalConfig, overrides: Overrides) -> Config {
        Config {
            workspace,
            global,
            workspace_root: None,
            overrides,
        }
    }

    #[test]
    fn defaults() {
        let effective = config(
            WorkspaceConfig::default(),
            GlobalConfig::default(),
            Overrides::default(),
        )
        .effective()
        .unwrap();

        assert_eq!(effective.url, DEFAULT_URL);
        assert_eq!(effective.format, OutputFormat::Text);
        assert!(effective.org.is_none());
    }

    #[test]
    fn parse_workspace_config() {
        let toml = r#"
org = "acme"
project = "web"
"#;

        let config: WorkspaceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.org.as_deref(), Some("acme"));
        assert_eq!(config.project.as_deref(), Some("web"));
        assert!(config.url.is_none());
    }

    #[test]
    fn parse_global_config() {
        let toml = r#"
default_format = "json"
token = "abc"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
        assert_eq!(config.token.as_deref(), Some("abc"));
    }

    #[test]
    fn layers_override_in_order() {
        let effective = config(
            WorkspaceConfig {
                org: Some("workspace-org".to_string()),
                project: Some("web".to_string()),
                url: Some("https://workspace.example/".to_string()),
            },
            GlobalConfig {
                org: Some("global-org".to_string()),
                url: Some("https://global.example/".to_string()),
                token: Some("global-token".to_string()),
                default_format: OutputFormat::Json,
            },
            Overrides {
                org: Some("flag-org".to_string()),
                format: Some(OutputFormat::Text),
                ..Overrides::default()
            },
        )
        .effective()
        .unwrap();

        assert_eq!(effective.org.as_deref(), Some("flag-org"));
        assert_eq!(effective.url, "https://workspace.example/");
        assert_eq!(effective.token.as_deref(), Some("global-token"));
        assert_eq!(effective.format, OutputFormat::Text);
        assert_eq!(effective.project.as_deref(), Some("web"));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let result = config(
            WorkspaceConfig::default(),
            GlobalConfig::default(),
            Overrides {
                url: Some("not a url".to_string()),
                ..Overrides::default()
            },
        )
        .effective();

        assert!(result.is_err());
    }

    #[test]
    fn token_is_redacted() {
        assert_eq!(redact("short"), "*****");
        assert_eq!(redact("sntrys_1234567890abcd"), "*****************abcd");

        let effective = Effective {
            url: DEFAULT_URL.to_string(),
            org: None,
            project: None,
            token: Some("0123456789".to_string()),
            format: OutputFormat::Text,
            workspace: None,
        };
        assert_eq!(effective.redacted().token.as_deref(), Some("******6789"));
    }

    #[test]
    fn find_workspace_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(WORKSPACE_DIR)).unwrap();
        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_workspace_root_from(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn no_workspace_outside() {
        let dir = TempDir::new().unwrap();
        assert!(Config::find_workspace_root_from(dir.path()).is_none());
    }
}
