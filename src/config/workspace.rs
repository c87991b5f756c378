//! Workspace management
//!
//! A workspace is a directory holding `.lookout/config.toml`, which pins the
//! organization, project and server for commands run inside it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::settings::{Config, WorkspaceConfig, WORKSPACE_DIR};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Not in a lookout workspace. Run 'lookout init' first.")]
    NotInWorkspace,
}

const CONFIG_HEADER: &str = "# lookout workspace configuration\n\n";

/// A lookout workspace
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Opens an existing workspace at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(WORKSPACE_DIR).is_dir() {
            return Err(WorkspaceError::NotInWorkspace.into());
        }

        let config = Config::for_workspace(&root)?;
        Ok(Self { root, config })
    }

    /// Opens the workspace at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let root = Config::find_workspace_root_from(&cwd).ok_or(WorkspaceError::NotInWorkspace)?;
        Self::open(root)
    }

    /// Initializes a workspace, or updates the settings of an existing one
    ///
    /// Fields left unset in `settings` keep their current value.
    pub fn init(root: impl Into<PathBuf>, settings: WorkspaceConfig) -> Result<Self> {
        let root = root.into();
        let dir = root.join(WORKSPACE_DIR);

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {} directory: {}", WORKSPACE_DIR, dir.display()))?;

        let mut workspace = Self::open(&root)?;
        workspace.config.workspace.merge(settings);
        workspace.save()?;

        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the `.lookout` directory path
    pub fn dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir().join("config.toml")
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &WorkspaceConfig {
        &self.config.workspace
    }

    fn save(&self) -> Result<()> {
        let body = toml::to_string_pretty(&self.config.workspace)
            .context("Failed to serialize workspace config")?;
        let path = self.config_path();
        fs::write(&path, format!("{}{}", CONFIG_HEADER, body))
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(org: &str) -> WorkspaceConfig {
        WorkspaceConfig {
            org: Some(org.to_string()),
            ..WorkspaceConfig::default()
        }
    }

    #[test]
    fn init_creates_config() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::init(dir.path(), settings("acme")).unwrap();

        assert!(workspace.dir().is_dir());
        let content = fs::read_to_string(workspace.config_path()).unwrap();
        assert!(content.starts_with("# lookout"));
        assert!(content.contains("org = \"acme\""));
    }

    #[test]
    fn init_keeps_unset_fields() {
        let dir = TempDir::new().unwrap();
        Workspace::init(
            dir.path(),
            WorkspaceConfig {
                org: Some("acme".to_string()),
                project: Some("web".to_string()),
                url: None,
            },
        )
        .unwrap();

        let workspace = Workspace::init(dir.path(), settings("globex")).unwrap();
        assert_eq!(workspace.settings().org.as_deref(), Some("globex"));
        assert_eq!(workspace.settings().project.as_deref(), Some("web"));

        let reopened = Workspace::open(dir.path()).unwrap();
        assert_eq!(reopened.settings(), workspace.settings());
    }

    #[test]
    fn open_non_workspace_fails() {
        let dir = TempDir::new().unwrap();
        let err = Workspace::open(dir.path()).err().unwrap();
        assert!(err.downcast_ref::<WorkspaceError>().is_some());
    }
}
