//! Group (issue) domain model
//!
//! A group is the server's aggregate of similar error events. The client
//! keeps groups in the group store and only changes them through patches
//! produced by action creators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{ActorKind, ActorRef, GroupId};

/// Resolution status of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    #[default]
    Unresolved,
    Resolved,
    Ignored,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Unresolved => "unresolved",
            GroupStatus::Resolved => "resolved",
            GroupStatus::Ignored => "ignored",
        }
    }
}

/// A user or team as embedded in API payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub kind: ActorKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Actor {
    /// Returns the `{kind}:{id}` reference for this actor
    pub fn reference(&self) -> ActorRef {
        match self.kind {
            ActorKind::User => ActorRef::user(self.id.clone()),
            ActorKind::Team => ActorRef::team(self.id.clone()),
        }
    }
}

/// Kind of activity recorded on a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Note,
    Assigned,
    Unassigned,
    SetResolved,
    SetUnresolved,
    SetIgnored,
    Merge,
    #[serde(other)]
    Other,
}

/// One entry of a group's activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ActivityType,

    #[serde(default)]
    pub data: serde_json::Value,

    pub date_created: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Actor>,
}

impl Activity {
    /// Creates a note activity
    pub fn note(id: impl Into<String>, text: &str, user: Option<Actor>) -> Self {
        Self {
            id: id.into(),
            kind: ActivityType::Note,
            data: serde_json::json!({ "text": text }),
            date_created: Utc::now(),
            user,
        }
    }

    /// Returns the note text, if this is a note
    pub fn note_text(&self) -> Option<&str> {
        if self.kind != ActivityType::Note {
            return None;
        }
        self.data.get("text").and_then(|v| v.as_str())
    }
}

/// Project a group belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectRef {
    #[serde(default)]
    pub id: String,

    pub slug: String,
}

/// A group (issue)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,

    #[serde(default)]
    pub short_id: String,

    pub title: String,

    #[serde(default)]
    pub culprit: Option<String>,

    #[serde(default)]
    pub status: GroupStatus,

    #[serde(default)]
    pub assigned_to: Option<Actor>,

    #[serde(default)]
    pub is_bookmarked: bool,

    #[serde(default)]
    pub has_seen: bool,

    /// Event count; the API sends this as a string
    #[serde(default, deserialize_with = "count_from_str_or_number")]
    pub count: u64,

    #[serde(default)]
    pub user_count: u64,

    #[serde(default)]
    pub num_comments: u32,

    #[serde(default)]
    pub project: ProjectRef,

    #[serde(default)]
    pub first_seen: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activity: Vec<Activity>,
}

fn count_from_str_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom("count must be a non-negative integer")),
        serde_json::Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        serde_json::Value::Null => Ok(0),
        _ => Err(serde::de::Error::custom("expected count as string or number")),
    }
}

impl Group {
    /// Applies a bulk-update patch in place
    pub fn apply(&mut self, patch: &GroupPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(bookmarked) = patch.is_bookmarked {
            self.is_bookmarked = bookmarked;
        }
        if let Some(seen) = patch.has_seen {
            self.has_seen = seen;
        }
    }

    /// Adds an activity entry at the top of the feed
    pub fn push_activity(&mut self, activity: Activity) {
        if activity.kind == ActivityType::Note {
            self.num_comments += 1;
        }
        self.activity.insert(0, activity);
    }

    /// Removes an activity entry, returning it
    pub fn remove_activity(&mut self, activity_id: &str) -> Option<Activity> {
        let index = self.activity.iter().position(|a| a.id == activity_id)?;
        let removed = self.activity.remove(index);
        if removed.kind == ActivityType::Note {
            self.num_comments = self.num_comments.saturating_sub(1);
        }
        Some(removed)
    }

    /// Finds an activity entry by ID
    pub fn activity_mut(&mut self, activity_id: &str) -> Option<&mut Activity> {
        self.activity.iter_mut().find(|a| a.id == activity_id)
    }
}

/// Partial update applied to one or more groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GroupStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bookmarked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_seen: Option<bool>,
}

impl GroupPatch {
    pub fn status(status: GroupStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn bookmark(bookmarked: bool) -> Self {
        Self {
            is_bookmarked: Some(bookmarked),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.is_bookmarked.is_none() && self.has_seen.is_none()
    }
}

/// Server response to a merge request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub parent: GroupId,

    pub children: Vec<GroupId>,
}
