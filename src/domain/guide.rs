//! Onboarding guide model and eligibility
//!
//! A guide is a sequence of steps, each pointing at an anchor (a named spot in
//! a view). The server only reports which guides exist for the user and
//! whether they were seen; step content comes from the built-in catalogue.
//!
//! Selection is a pure function of the registered anchors, the guide list,
//! the force-show flag, the feature flag and condition results, so it can be
//! recomputed whenever any of those change.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// One step of a guide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideStep {
    pub title: String,

    /// Anchor this step points at
    pub target: String,

    pub description: String,
}

/// A guide as known to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    pub key: String,

    /// Anchors that must all be registered before the guide can show
    pub required_targets: Vec<String>,

    pub steps: Vec<GuideStep>,

    #[serde(default)]
    pub seen: bool,

    /// Name of an extra condition that must hold, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Entry of the `/assistant/` listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantEntry {
    pub guide: String,

    #[serde(default)]
    pub seen: bool,
}

/// How the user left a guide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideOutcome {
    /// Closed before the last step
    Dismissed,
    /// Reached and confirmed the last step
    Viewed,
}

impl GuideOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuideOutcome::Dismissed => "dismissed",
            GuideOutcome::Viewed => "viewed",
        }
    }
}

/// Name of the condition that gates the alert reminder guide
pub const ALERT_REMINDER_CONDITION: &str = "alert_reminder";

fn step(title: &str, target: &str, description: &str) -> GuideStep {
    GuideStep {
        title: title.to_string(),
        target: target.to_string(),
        description: description.to_string(),
    }
}

/// Built-in guide content, keyed by guide key
pub fn catalogue() -> Vec<Guide> {
    vec![
        Guide {
            key: "alert_reminder".to_string(),
            required_targets: vec!["alerts_nav".to_string()],
            steps: vec![step(
                "Set up alerts",
                "alerts_nav",
                "This project receives events but has no alert rules. Add one to hear about new issues.",
            )],
            seen: false,
            condition: Some(ALERT_REMINDER_CONDITION.to_string()),
        },
        Guide {
            key: "issue".to_string(),
            required_targets: vec!["issue_title".to_string(), "exception".to_string()],
            steps: vec![
                step(
                    "Issue details",
                    "issue_title",
                    "The issue title and culprit summarise what went wrong and where.",
                ),
                step(
                    "Stacktrace",
                    "exception",
                    "The exception shows the frames that led to the error.",
                ),
                step(
                    "Breadcrumbs",
                    "breadcrumbs",
                    "Breadcrumbs are the trail of events that happened before the error.",
                ),
                step(
                    "Tags",
                    "tags",
                    "Tags break the events down by browser, release and other dimensions.",
                ),
                step(
                    "Resolve",
                    "resolve",
                    "Resolve the issue once it is fixed; it reopens if it happens again.",
                ),
            ],
            seen: false,
            condition: None,
        },
        Guide {
            key: "issue_stream".to_string(),
            required_targets: vec!["issue_stream".to_string()],
            steps: vec![
                step(
                    "Issues",
                    "issue_stream",
                    "Events are grouped into issues. Sort and filter them here.",
                ),
                step(
                    "Saved searches",
                    "saved_searches",
                    "Tabs hold saved searches with their current issue counts.",
                ),
            ],
            seen: false,
            condition: None,
        },
        Guide {
            key: "releases".to_string(),
            required_targets: vec!["releases".to_string()],
            steps: vec![step(
                "Releases",
                "releases",
                "Associate commits with releases to find suspect commits.",
            )],
            seen: false,
            condition: None,
        },
    ]
}

/// Combines the server's guide listing with the built-in content
///
/// Guides the server does not list are not shown; listed guides without
/// content are ignored.
pub fn merge_with_catalogue(entries: &[AssistantEntry]) -> Vec<Guide> {
    let seen: HashMap<&str, bool> = entries.iter().map(|e| (e.guide.as_str(), e.seen)).collect();

    catalogue()
        .into_iter()
        .filter_map(|mut guide| {
            let seen = *seen.get(guide.key.as_str())?;
            guide.seen = seen;
            Some(guide)
        })
        .collect()
}

/// Inputs of guide selection
#[derive(Debug, Clone, Copy)]
pub struct Eligibility<'a> {
    pub guides: &'a [Guide],
    pub anchors: &'a BTreeSet<String>,
    pub force_show: bool,
    pub feature_enabled: bool,
    pub conditions: &'a HashMap<String, bool>,
}

impl Guide {
    /// Returns true if every required target is registered
    pub fn targets_present(&self, anchors: &BTreeSet<String>) -> bool {
        self.required_targets.iter().all(|t| anchors.contains(t))
    }

    /// Returns true if the guide's condition holds (or it has none)
    ///
    /// Conditions that have not been evaluated yet do not hold.
    pub fn condition_holds(&self, conditions: &HashMap<String, bool>) -> bool {
        match &self.condition {
            None => true,
            Some(name) => conditions.get(name).copied().unwrap_or(false),
        }
    }

    /// Returns a copy without steps whose target is not registered
    pub fn with_present_steps(&self, anchors: &BTreeSet<String>) -> Guide {
        let mut guide = self.clone();
        guide.steps.retain(|s| anchors.contains(&s.target));
        guide
    }
}

/// Picks the guide to display, if any
pub fn select_guide(input: Eligibility<'_>) -> Option<Guide> {
    if !input.force_show && !input.feature_enabled {
        return None;
    }

    let mut candidates: Vec<&Guide> = input
        .guides
        .iter()
        .filter(|g| g.targets_present(input.anchors))
        .filter(|g| input.force_show || !g.seen)
        .collect();

    candidates.sort_by(|a, b| a.key.cmp(&b.key));

    // The first eligible guide wins even if none of its steps is on screen;
    // it then shows nothing rather than yielding to the next guide.
    let chosen = candidates
        .into_iter()
        .find(|g| g.condition_holds(input.conditions))?
        .with_present_steps(input.anchors);
    (!chosen.steps.is_empty()).then_some(chosen)
}
