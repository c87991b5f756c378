//! Issue details: the group, its latest event and its tag breakdown

use serde::{Deserialize, Serialize};

use super::{failed_section, Screen};
use crate::controller::{AsyncView, EndpointSpec, FetchState};
use crate::domain::{Group, GroupId};
use crate::store::StoreContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestEvent {
    #[serde(rename = "eventID", alias = "id")]
    event_id: String,

    #[serde(default)]
    message: String,

    #[serde(default)]
    title: String,

    #[serde(default)]
    platform: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagValue {
    value: String,
    count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagSummary {
    key: String,

    #[serde(default)]
    top_values: Vec<TagValue>,
}

pub struct IssueDetailsView {
    pub org: String,
    pub id: GroupId,
    stores: StoreContext,
}

impl IssueDetailsView {
    pub fn new(org: impl Into<String>, id: GroupId, stores: StoreContext) -> Self {
        Self {
            org: org.into(),
            id,
            stores,
        }
    }

    fn base(&self) -> String {
        format!("/organizations/{}/issues/{}/", self.org, self.id)
    }

    /// Puts the fetched group into the group store
    pub fn load_results(&self, state: &FetchState) {
        if let Some(group) = state.decode::<Group>("group") {
            self.stores.groups().lock().add(vec![group]);
        }
    }
}

impl AsyncView for IssueDetailsView {
    type Output = Screen;

    fn endpoints(&self) -> Vec<EndpointSpec> {
        let base = self.base();
        vec![
            EndpointSpec::new("group", base.clone()).critical(),
            EndpointSpec::new("event", format!("{}events/latest/", base)),
            EndpointSpec::new("tags", format!("{}tags/", base)),
        ]
    }

    fn render_loading(&self) -> Screen {
        Screen::loading()
    }

    fn render_error(&self, state: &FetchState) -> Screen {
        Screen::error(&format!("issue {}", self.id), state)
    }

    fn render_body(&self, state: &FetchState) -> Screen {
        let group = self.stores.groups().lock().get(&self.id).cloned();
        let Some(group) = group else {
            return Screen::error(&format!("issue {}", self.id), state);
        };

        let mut lines = vec![
            format!("{}  {}", group.short_id, group.title),
            format!(
                "Status: {}  Assignee: {}  Bookmarked: {}",
                group.status.as_str(),
                group.assigned_to.as_ref().map(|a| a.name.as_str()).unwrap_or("-"),
                if group.is_bookmarked { "yes" } else { "no" }
            ),
            format!("Events: {}  Users: {}", group.count, group.user_count),
        ];
        if let Some(culprit) = group.culprit.as_deref().filter(|c| !c.is_empty()) {
            lines.push(format!("Culprit: {}", culprit));
        }

        lines.push(String::new());
        lines.push("Latest event:".to_string());
        let event: Option<LatestEvent> = state.decode("event");
        match (&event, state.error("event")) {
            (Some(event), _) => {
                let summary = if event.message.is_empty() {
                    &event.title
                } else {
                    &event.message
                };
                lines.push(format!("  {}  {}", event.event_id, summary));
            }
            (None, Some(_)) => lines.push(failed_section("latest event")),
            (None, None) => lines.push("  (none)".to_string()),
        }

        lines.push(String::new());
        lines.push("Tags:".to_string());
        let tags: Option<Vec<TagSummary>> = state.decode("tags");
        match (&tags, state.error("tags")) {
            (Some(tags), _) if !tags.is_empty() => {
                for tag in tags {
                    let values: Vec<String> = tag
                        .top_values
                        .iter()
                        .map(|v| format!("{} ({})", v.value, v.count))
                        .collect();
                    lines.push(format!("  {}: {}", tag.key, values.join(", ")));
                }
            }
            (None, Some(_)) => lines.push(failed_section("tags")),
            _ => lines.push("  (none)".to_string()),
        }

        let notes: Vec<String> = group
            .activity
            .iter()
            .filter_map(|a| {
                let text = a.note_text()?;
                let author = a.user.as_ref().map(|u| u.name.as_str()).unwrap_or("unknown");
                Some(format!(
                    "  [{}] {} {}: {}",
                    a.id,
                    a.date_created.format("%Y-%m-%d %H:%M"),
                    author,
                    text
                ))
            })
            .collect();
        if !notes.is_empty() {
            lines.push(String::new());
            lines.push(format!("Notes ({}):", notes.len()));
            lines.extend(notes);
        }

        let errors: std::collections::BTreeMap<&str, String> =
            state.errors().map(|(k, e)| (k, e.to_string())).collect();
        Screen {
            lines,
            data: serde_json::json!({
                "group": group,
                "latestEvent": event,
                "tags": tags,
                "errors": errors,
            }),
            failed: false,
        }
    }
}
