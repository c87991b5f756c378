//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::session::Session;
use super::{config_cmd, guides, issues};
use crate::config::{Config, Overrides, Workspace, WorkspaceConfig};

#[derive(Parser)]
#[command(name = "lookout")]
#[command(author, version, about = "Terminal client for error-monitoring issue streams")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured format, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Serve API responses from a fixture file instead of the network
    #[arg(long, global = true, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Organization slug
    #[arg(long, global = true, env = "LOOKOUT_ORG")]
    pub org: Option<String>,

    /// Server URL
    #[arg(long, global = true, env = "LOOKOUT_URL")]
    pub url: Option<String>,

    /// API auth token
    #[arg(long, global = true, env = "LOOKOUT_AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a lookout workspace
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Default project for this workspace
        ///
        /// `--org` and `--url` are stored in the workspace as well.
        #[arg(long)]
        project: Option<String>,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),

    /// Browse and triage issues
    #[command(subcommand)]
    Issues(issues::IssueCommands),

    /// Onboarding guides
    #[command(subcommand)]
    Guides(guides::GuideCommands),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("LOOKOUT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "lookout_cli=debug" } else { "warn" })
    });

    // Ignore the error if a subscriber is already set
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(execute(cli))
}

async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(Overrides {
        url: cli.url.clone(),
        org: cli.org.clone(),
        token: cli.token,
        format: cli.format,
    })?;
    let format = config.effective()?.format;
    let output = Output::new(format, cli.verbose);

    output.verbose("lookout starting");

    match cli.command {
        Commands::Init { path, project } => {
            output.verbose_ctx("init", &format!("Initializing workspace at: {}", path));
            let settings = WorkspaceConfig {
                org: cli.org,
                project,
                url: cli.url,
            };
            let workspace = Workspace::init(&path, settings)?;
            output.verbose_ctx(
                "init",
                &format!("Wrote {}", workspace.config_path().display()),
            );
            output.success(&format!(
                "Initialized lookout workspace at {}",
                workspace.root().display()
            ));
        }

        Commands::Config(cmd) => config_cmd::run(cmd, &config, &output)?,

        Commands::Issues(cmd) => {
            let session = Session::open(&config, cli.replay.as_deref())?;
            issues::run(cmd, &session, &output).await?
        }

        Commands::Guides(cmd) => {
            let session = Session::open(&config, cli.replay.as_deref())?;
            guides::run(cmd, &session, &output).await?
        }
    }

    Ok(())
}
