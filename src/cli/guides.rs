//! Guide CLI commands

use anyhow::Result;
use clap::{Args, Subcommand};

use super::output::Output;
use super::session::Session;
use crate::actions::GuideActions;
use crate::domain::GuideOutcome;
use crate::store::{AnalyticsEvent, GuideState};

/// Where the user is: the anchors on screen and the current route
#[derive(Args)]
pub struct PanelArgs {
    /// Anchors present on screen (repeat or comma-separate)
    #[arg(long = "anchor", value_delimiter = ',')]
    anchors: Vec<String>,

    /// Current route; a `#assistant` fragment forces the panel open
    #[arg(long, default_value = "/")]
    route: String,

    /// Active project (defaults to the workspace project)
    #[arg(long)]
    project: Option<String>,
}

#[derive(Subcommand)]
pub enum GuideCommands {
    /// Show the guide that would be displayed for a screen
    ///
    /// Examples:
    ///   lookout guides show --anchor issue_title,exception
    ///   lookout guides show --anchor issue_stream --route '/issues/#assistant'
    Show {
        #[command(flatten)]
        panel: PanelArgs,

        /// Jump to a step (1-based)
        #[arg(long)]
        step: Option<usize>,
    },

    /// Close the guide currently showing for a screen
    Close {
        #[command(flatten)]
        panel: PanelArgs,

        /// Advance to the last step first, so the guide counts as viewed
        #[arg(long)]
        finish: bool,
    },

    /// Mark a guide as dismissed
    Dismiss {
        /// Guide key
        key: String,
    },

    /// Mark a guide as viewed
    Finish {
        /// Guide key
        key: String,
    },
}

pub async fn run(cmd: GuideCommands, session: &Session, output: &Output) -> Result<()> {
    match cmd {
        GuideCommands::Show { panel, step } => show_guide(session, output, panel, step).await,
        GuideCommands::Close { panel, finish } => close_guide(session, output, panel, finish).await,
        GuideCommands::Dismiss { key } => mark(session, output, &key, GuideOutcome::Dismissed).await,
        GuideCommands::Finish { key } => mark(session, output, &key, GuideOutcome::Viewed).await,
    }
}

/// Loads the org, guides and conditions for a screen
async fn open_panel(session: &Session, output: &Output, panel: PanelArgs) -> Result<GuideActions> {
    let org = session.org()?;
    let config = session.config_actions();
    config.switch_organization(org).await?;
    config.switch_project(session.project(panel.project));

    let actions = session.guide_actions();
    let count = actions.fetch_guides().await?;
    output.verbose_ctx("guides", &format!("Fetched {} guide(s)", count));

    {
        let mut store = session.stores().guides().lock();
        for anchor in panel.anchors.iter().filter(|a| !a.trim().is_empty()) {
            store.register_anchor(anchor.trim());
        }
        let (path, fragment) = match panel.route.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (panel.route.as_str(), None),
        };
        store.set_location(path, fragment);
    }

    actions.evaluate_conditions().await;
    Ok(actions)
}

async fn show_guide(
    session: &Session,
    output: &Output,
    panel: PanelArgs,
    step: Option<usize>,
) -> Result<()> {
    open_panel(session, output, panel).await?;

    let (state, events) = {
        let mut store = session.stores().guides().lock();
        if let Some(step) = step {
            if step == 0 || !store.to_step(step - 1) {
                anyhow::bail!("Step {} is out of range for the current guide", step);
            }
        }
        (store.state(), store.take_events())
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "guide": state.current_guide,
            "step": state.current_step,
            "forceShow": state.force_show,
            "events": events,
        }));
        return Ok(());
    }

    output.lines(&render_panel(&state, &events));
    Ok(())
}

async fn close_guide(session: &Session, output: &Output, panel: PanelArgs, finish: bool) -> Result<()> {
    let actions = open_panel(session, output, panel).await?;

    if finish {
        let mut store = session.stores().guides().lock();
        while store.next_step() {}
    }

    let closed = actions.close_guide().await?;
    let events = session.stores().guides().lock().take_events();

    match closed {
        Some((key, outcome)) => {
            if output.is_json() {
                output.data(&serde_json::json!({
                    "guide": key,
                    "status": outcome.as_str(),
                    "events": events,
                }));
            } else {
                output.success(&format!("Closed guide {} ({})", key, outcome.as_str()));
            }
        }
        None => output.success("No guide is showing"),
    }
    Ok(())
}

async fn mark(session: &Session, output: &Output, key: &str, outcome: GuideOutcome) -> Result<()> {
    session.guide_actions().mark_guide(key, outcome).await?;
    output.success(&format!("Marked guide {} as {}", key, outcome.as_str()));
    Ok(())
}

fn render_panel(state: &GuideState, events: &[AnalyticsEvent]) -> Vec<String> {
    let Some(guide) = &state.current_guide else {
        return vec!["No guide to show".to_string()];
    };

    let mut lines = vec![format!(
        "Guide: {} (step {} of {})",
        guide.key,
        state.current_step + 1,
        guide.steps.len()
    )];
    for (i, step) in guide.steps.iter().enumerate() {
        let marker = if i == state.current_step { ">" } else { " " };
        lines.push(format!("{} {}. {} [{}]", marker, i + 1, step.title, step.target));
        lines.push(format!("     {}", step.description));
    }

    if !events.is_empty() {
        lines.push(String::new());
        for event in events {
            lines.push(format!("event: {} {}", event.name, event.guide));
        }
    }
    lines
}
