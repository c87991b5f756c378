//! Issue CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::session::Session;
use super::views::{self, IssueDetailsView, IssueListView};
use crate::controller::AsyncView;
use crate::domain::{Actor, ActorRef, GroupId, GroupPatch, GroupStatus};

#[derive(Subcommand)]
pub enum IssueCommands {
    /// List issues matching a search
    List {
        /// Search query
        #[arg(long, short, default_value = "is:unresolved")]
        query: String,

        /// Limit to a project (defaults to the workspace project)
        #[arg(long)]
        project: Option<String>,

        /// Page cursor from a previous listing
        #[arg(long)]
        cursor: Option<String>,

        /// Issues per page
        #[arg(long, default_value = "25")]
        limit: u32,
    },

    /// Show issue details
    Show {
        /// Issue ID
        id: String,
    },

    /// Assign an issue to a user or team, or clear its assignee
    ///
    /// Examples:
    ///   lookout issues assign 4512 --to user:10
    ///   lookout issues assign 4512 --to team:3
    ///   lookout issues assign 4512             # unassign
    Assign {
        /// Issue ID
        id: String,

        /// Assignee as user:{id}, team:{id} or a bare user ID
        #[arg(long)]
        to: Option<String>,
    },

    /// Mark issues as resolved
    Resolve {
        /// Issue IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Mark issues as unresolved
    Unresolve {
        /// Issue IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Ignore issues
    Ignore {
        /// Issue IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Bookmark issues
    Bookmark {
        /// Issue IDs
        #[arg(required = true)]
        ids: Vec<String>,

        /// Remove the bookmark instead
        #[arg(long)]
        remove: bool,
    },

    /// Delete issues
    Delete {
        /// Issue IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Merge two or more issues into one
    Merge {
        /// Issue IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Manage notes on an issue
    #[command(subcommand)]
    Note(NoteCommands),
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Add a note
    Add {
        /// Issue ID
        id: String,

        /// Note text
        text: String,
    },

    /// Change a note's text
    Edit {
        /// Issue ID
        id: String,

        /// Note ID
        note_id: String,

        /// New text
        text: String,
    },

    /// Delete a note
    Rm {
        /// Issue ID
        id: String,

        /// Note ID
        note_id: String,
    },
}

pub async fn run(cmd: IssueCommands, session: &Session, output: &Output) -> Result<()> {
    match cmd {
        IssueCommands::List {
            query,
            project,
            cursor,
            limit,
        } => list_issues(session, output, query, project, cursor, limit).await,
        IssueCommands::Show { id } => show_issue(session, output, &id).await,
        IssueCommands::Assign { id, to } => assign(session, output, &id, to.as_deref()).await,
        IssueCommands::Resolve { ids } => {
            update(session, output, &ids, GroupPatch::status(GroupStatus::Resolved), "Resolved").await
        }
        IssueCommands::Unresolve { ids } => {
            update(session, output, &ids, GroupPatch::status(GroupStatus::Unresolved), "Unresolved").await
        }
        IssueCommands::Ignore { ids } => {
            update(session, output, &ids, GroupPatch::status(GroupStatus::Ignored), "Ignored").await
        }
        IssueCommands::Bookmark { ids, remove } => {
            let verb = if remove { "Removed bookmark from" } else { "Bookmarked" };
            update(session, output, &ids, GroupPatch::bookmark(!remove), verb).await
        }
        IssueCommands::Delete { ids } => delete(session, output, &ids).await,
        IssueCommands::Merge { ids } => merge(session, output, &ids).await,
        IssueCommands::Note(cmd) => run_note(cmd, session, output).await,
    }
}

async fn run_note(cmd: NoteCommands, session: &Session, output: &Output) -> Result<()> {
    let actions = session.group_actions()?;

    match cmd {
        NoteCommands::Add { id, text } => {
            let id: GroupId = id.parse()?;
            let note = actions.create_note(&id, &text, None).await?;
            if output.is_json() {
                output.data(&note);
            } else {
                output.success(&format!("Added note {} to issue {}", note.id, id));
            }
        }
        NoteCommands::Edit { id, note_id, text } => {
            let id: GroupId = id.parse()?;
            let note = actions.update_note(&id, &note_id, &text).await?;
            if output.is_json() {
                output.data(&note);
            } else {
                output.success(&format!("Updated note {} on issue {}", note.id, id));
            }
        }
        NoteCommands::Rm { id, note_id } => {
            let id: GroupId = id.parse()?;
            actions.delete_note(&id, &note_id).await?;
            output.success(&format!("Deleted note {} from issue {}", note_id, id));
        }
    }

    Ok(())
}

fn parse_ids(ids: &[String]) -> Result<Vec<GroupId>> {
    ids.iter()
        .map(|id| id.parse::<GroupId>().map_err(Into::into))
        .collect()
}

async fn list_issues(
    session: &Session,
    output: &Output,
    query: String,
    project: Option<String>,
    cursor: Option<String>,
    limit: u32,
) -> Result<()> {
    let mut view = IssueListView::new(session.org()?, query, session.stores().clone());
    view.project = session.project(project);
    view.cursor = cursor;
    view.limit = limit;

    output.verbose_ctx("issues", &format!("Listing issues: query={:?}", view.query));

    let controller = session.controller();
    let state = views::load(&controller, &view).await;
    view.load_results(&state);
    let screen = view.render(&state);
    controller.unmount();

    views::present(output, &state, screen)
}

async fn show_issue(session: &Session, output: &Output, id: &str) -> Result<()> {
    let view = IssueDetailsView::new(session.org()?, id.parse()?, session.stores().clone());

    let controller = session.controller();
    let state = views::load(&controller, &view).await;
    view.load_results(&state);
    let screen = view.render(&state);
    controller.unmount();

    views::present(output, &state, screen)
}

async fn assign(session: &Session, output: &Output, id: &str, to: Option<&str>) -> Result<()> {
    let id: GroupId = id.parse()?;
    let assignee = match to {
        Some(to) => {
            let reference: ActorRef = to.parse()?;
            Some(Actor {
                id: reference.id().to_string(),
                name: reference.to_string(),
                kind: reference.kind(),
                email: None,
            })
        }
        None => None,
    };

    let group = session.group_actions()?.assign_to(&id, assignee).await?;

    if output.is_json() {
        output.data(&group);
    } else {
        match &group.assigned_to {
            Some(actor) => output.success(&format!("Assigned {} to {}", group.short_id, actor.name)),
            None => output.success(&format!("Unassigned {}", group.short_id)),
        }
    }
    Ok(())
}

async fn update(
    session: &Session,
    output: &Output,
    ids: &[String],
    patch: GroupPatch,
    verb: &str,
) -> Result<()> {
    let ids = parse_ids(ids)?;
    let applied = session.group_actions()?.bulk_update(&ids, patch).await?;

    if output.is_json() {
        output.data(&serde_json::json!({ "ids": ids, "applied": applied }));
    } else {
        output.success(&format!("{} {} issue(s)", verb, ids.len()));
    }
    Ok(())
}

async fn delete(session: &Session, output: &Output, ids: &[String]) -> Result<()> {
    let ids = parse_ids(ids)?;
    session.group_actions()?.bulk_delete(&ids).await?;
    output.success(&format!("Deleted {} issue(s)", ids.len()));
    Ok(())
}

async fn merge(session: &Session, output: &Output, ids: &[String]) -> Result<()> {
    let ids = parse_ids(ids)?;
    let result = session.group_actions()?.merge(&ids).await?;

    if output.is_json() {
        output.data(&result);
    } else {
        output.success(&format!(
            "Merged {} issue(s) into {}",
            result.children.len(),
            result.parent
        ));
    }
    Ok(())
}
