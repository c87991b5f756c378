//! Config CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::config::{Config, OutputFormat, WORKSPACE_DIR};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (token redacted)
    Show,

    /// Show where configuration files are read from
    Path,
}

pub fn run(cmd: ConfigCommands, config: &Config, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config, output),
        ConfigCommands::Path => path(config, output),
    }
}

fn show(config: &Config, output: &Output) -> Result<()> {
    let effective = config.effective()?.redacted();

    if output.is_json() {
        output.data(&effective);
        return Ok(());
    }

    let none = "(not set)".to_string();
    output.lines(&[
        format!("url:       {}", effective.url),
        format!("org:       {}", effective.org.as_ref().unwrap_or(&none)),
        format!("project:   {}", effective.project.as_ref().unwrap_or(&none)),
        format!("token:     {}", effective.token.as_ref().unwrap_or(&none)),
        format!(
            "format:    {}",
            match effective.format {
                OutputFormat::Text => "text",
                OutputFormat::Json => "json",
            }
        ),
        format!(
            "workspace: {}",
            effective
                .workspace
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or(none)
        ),
    ]);
    Ok(())
}

fn path(config: &Config, output: &Output) -> Result<()> {
    let global = Config::global_config_dir().map(|d| d.join("config.toml"));
    let workspace = config
        .workspace_root
        .as_ref()
        .map(|root| root.join(WORKSPACE_DIR).join("config.toml"));

    if output.is_json() {
        output.data(&serde_json::json!({ "global": global, "workspace": workspace }));
    } else {
        let show = |p: Option<std::path::PathBuf>| {
            p.map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        };
        output.lines(&[
            format!("global:    {}", show(global)),
            format!("workspace: {}", show(workspace)),
        ]);
    }
    Ok(())
}
