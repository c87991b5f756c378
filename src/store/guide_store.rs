//! Guide store
//!
//! Tracks which anchors are on screen, which guides exist for the user and
//! which one (if any) should be showing. Every input change recomputes the
//! selection with [`select_guide`]; the result is never cached across inputs.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::topics::{StoreEvent, Topic, Topics};
use crate::domain::guide::{select_guide, Eligibility};
use crate::domain::{Guide, GuideOutcome};

/// URL fragment that forces the guide panel open
pub const FORCE_SHOW_FRAGMENT: &str = "assistant";

/// Analytics event emitted by guide interactions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub name: String,
    pub guide: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

/// Snapshot of what the guide panel shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideState {
    pub current_guide: Option<Guide>,
    pub current_step: usize,
    pub force_show: bool,
    pub anchors: BTreeSet<String>,
    pub location: String,
    pub org: Option<String>,
    pub project: Option<String>,
}

pub struct GuideStore {
    guides: Vec<Guide>,
    anchors: BTreeSet<String>,
    conditions: HashMap<String, bool>,
    feature_enabled: bool,
    force_show: bool,
    location: String,
    org: Option<String>,
    project: Option<String>,
    current_guide: Option<Guide>,
    current_step: usize,
    prev_guide: Option<String>,
    events: Vec<AnalyticsEvent>,
    topics: Topics,
}

impl GuideStore {
    pub fn new(topics: Topics) -> Self {
        Self {
            guides: Vec::new(),
            anchors: BTreeSet::new(),
            conditions: HashMap::new(),
            feature_enabled: false,
            force_show: false,
            location: String::from("/"),
            org: None,
            project: None,
            current_guide: None,
            current_step: 0,
            prev_guide: None,
            events: Vec::new(),
            topics,
        }
    }

    /// Replaces the guide list after `/assistant/` answered
    pub fn fetch_succeeded(&mut self, guides: Vec<Guide>) {
        self.guides = guides;
        self.recompute();
    }

    pub fn register_anchor(&mut self, target: impl Into<String>) {
        if self.anchors.insert(target.into()) {
            self.recompute();
        }
    }

    pub fn unregister_anchor(&mut self, target: &str) {
        if self.anchors.remove(target) {
            self.recompute();
        }
    }

    /// Route change; the `#assistant` fragment forces the panel open
    pub fn set_location(&mut self, path: impl Into<String>, fragment: Option<&str>) {
        self.location = path.into();
        self.force_show = fragment.map(|f| f.trim_start_matches('#')) == Some(FORCE_SHOW_FRAGMENT);
        self.recompute();
    }

    pub fn set_active_org(&mut self, slug: Option<String>, feature_enabled: bool) {
        self.org = slug;
        self.feature_enabled = feature_enabled;
        self.recompute();
    }

    pub fn set_active_project(&mut self, slug: Option<String>) {
        self.project = slug;
        // Condition results depend on the project
        self.conditions.clear();
        self.recompute();
    }

    /// Records the outcome of an asynchronous guide condition
    pub fn set_condition(&mut self, name: impl Into<String>, holds: bool) {
        self.conditions.insert(name.into(), holds);
        self.recompute();
    }

    pub fn guides(&self) -> &[Guide] {
        &self.guides
    }

    pub fn current_guide(&self) -> Option<&Guide> {
        self.current_guide.as_ref()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    pub fn state(&self) -> GuideState {
        GuideState {
            current_guide: self.current_guide.clone(),
            current_step: self.current_step,
            force_show: self.force_show,
            anchors: self.anchors.clone(),
            location: self.location.clone(),
            org: self.org.clone(),
            project: self.project.clone(),
        }
    }

    /// Drains analytics events emitted since the last call
    pub fn take_events(&mut self) -> Vec<AnalyticsEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advances to the next step; returns false on the last step
    pub fn next_step(&mut self) -> bool {
        let Some(guide) = &self.current_guide else {
            return false;
        };
        if self.current_step + 1 >= guide.steps.len() {
            return false;
        }
        self.current_step += 1;
        self.topics.trigger(Topic::Guides, StoreEvent::GuidesChanged);
        true
    }

    pub fn to_step(&mut self, step: usize) -> bool {
        let Some(guide) = &self.current_guide else {
            return false;
        };
        if step >= guide.steps.len() {
            return false;
        }
        self.current_step = step;
        self.topics.trigger(Topic::Guides, StoreEvent::GuidesChanged);
        true
    }

    /// Closes the current guide and marks it seen
    ///
    /// Returns the guide key and how it was left, for reporting to the server.
    pub fn close_guide(&mut self) -> Option<(String, GuideOutcome)> {
        let guide = self.current_guide.take()?;
        let outcome = if self.current_step + 1 >= guide.steps.len() {
            GuideOutcome::Viewed
        } else {
            GuideOutcome::Dismissed
        };

        self.mark_seen(&guide.key);
        self.emit(
            match outcome {
                GuideOutcome::Viewed => "guide.finished",
                GuideOutcome::Dismissed => "guide.dismissed",
            },
            &guide.key,
            Some(self.current_step),
        );
        self.force_show = false;
        self.current_step = 0;
        self.recompute();

        Some((guide.key, outcome))
    }

    /// Marks a guide seen without it being current
    pub fn mark_seen(&mut self, key: &str) {
        if let Some(guide) = self.guides.iter_mut().find(|g| g.key == key) {
            guide.seen = true;
        }
    }

    fn emit(&mut self, name: &str, guide: &str, step: Option<usize>) {
        let event = AnalyticsEvent {
            name: name.to_string(),
            guide: guide.to_string(),
            step,
            org: self.org.clone(),
        };
        tracing::info!(event = %event.name, guide = %event.guide, "analytics");
        self.events.push(event);
    }

    fn recompute(&mut self) {
        let selected = select_guide(Eligibility {
            guides: &self.guides,
            anchors: &self.anchors,
            force_show: self.force_show,
            feature_enabled: self.feature_enabled,
            conditions: &self.conditions,
        });

        let selected_key = selected.as_ref().map(|g| g.key.clone());
        let current_key = self.current_guide.as_ref().map(|g| g.key.clone());
        if selected_key != current_key {
            self.current_step = 0;
        }

        if let Some(key) = &selected_key {
            if self.prev_guide.as_deref() != Some(key.as_str()) {
                self.emit("guide.cue", key, None);
                self.prev_guide = Some(key.clone());
            }
        }

        if let Some(guide) = &selected {
            self.current_step = self.current_step.min(guide.steps.len().saturating_sub(1));
        }
        self.current_guide = selected;

        tracing::debug!(guide = ?selected_key, anchors = self.anchors.len(), "guides.recompute");
        self.topics.trigger(Topic::Guides, StoreEvent::GuidesChanged);
    }
}
