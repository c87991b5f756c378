//! Group store
//!
//! Holds the groups currently shown, in server order. Every mutation comes in
//! three parts keyed by one [`RequestId`]:
//! - `on_x(request, ..)` applies the optimistic patch,
//! - `on_x_success(request, .., server_result)` commits or drops the answer,
//! - `on_x_error(request, .., error)` rolls the patch back.
//!
//! The [`PendingLedger`] decides whether an answer is still relevant, so a slow
//! response can never overwrite a newer write to the same group.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;

use super::ledger::{EntityState, PendingLedger, Reconcile};
use super::topics::{StoreEvent, Topic, Topics};
use crate::api::RequestError;
use crate::domain::{Activity, ActivityType, Actor, Group, GroupId, GroupPatch, MergeResult, RequestId};

/// A group's position and value as captured before a write
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub index: usize,
    pub group: Option<Group>,
}

/// Keeps the server's fields but the locally known activity feed when the
/// server response does not carry one
fn carry_activity(mut server: Group, previous: Option<&Group>) -> Group {
    if let Some(previous) = previous {
        if server.activity.is_empty() {
            server.activity = previous.activity.clone();
            server.num_comments = previous.num_comments;
        }
    }
    server
}

pub struct GroupStore {
    items: Vec<Group>,
    ledger: PendingLedger<GroupId, Slot>,
    topics: Topics,
}

impl GroupStore {
    pub fn new(topics: Topics) -> Self {
        Self {
            items: Vec::new(),
            ledger: PendingLedger::new(),
            topics,
        }
    }

    /// Replaces the contents with a fresh server listing
    ///
    /// Pending writes are forgotten; their answers will be dropped as stale.
    pub fn load_initial_data(&mut self, groups: Vec<Group>) {
        let mut changed: BTreeSet<GroupId> = self.items.iter().map(|g| g.id.clone()).collect();
        changed.extend(groups.iter().map(|g| g.id.clone()));

        self.items = groups;
        self.ledger.reset();
        self.changed(changed);
    }

    /// Adds groups, replacing any already present with the same ID
    pub fn add(&mut self, groups: Vec<Group>) {
        let mut changed = BTreeSet::new();
        for group in groups {
            changed.insert(group.id.clone());
            self.upsert(group);
        }
        self.changed(changed);
    }

    /// Removes groups without going through a server write
    pub fn remove(&mut self, ids: &[GroupId]) {
        self.items.retain(|g| !ids.contains(&g.id));
        for id in ids {
            self.ledger.forget(id);
        }
        self.changed(ids.iter().cloned());
    }

    pub fn get(&self, id: &GroupId) -> Option<&Group> {
        self.items.iter().find(|g| &g.id == id)
    }

    pub fn get_all(&self) -> &[Group] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Write state of a group
    pub fn state(&self, id: &GroupId) -> EntityState {
        self.ledger.state(id)
    }

    pub fn has_pending_writes(&self) -> bool {
        self.ledger.pending_count() > 0
    }

    fn position(&self, id: &GroupId) -> Option<usize> {
        self.items.iter().position(|g| &g.id == id)
    }

    fn get_mut(&mut self, id: &GroupId) -> Option<&mut Group> {
        self.items.iter_mut().find(|g| &g.id == id)
    }

    fn upsert(&mut self, group: Group) {
        match self.position(&group.id) {
            Some(index) => self.items[index] = group,
            None => self.items.push(group),
        }
    }

    fn snapshot(&self, id: &GroupId) -> Slot {
        Slot {
            index: self.position(id).unwrap_or(self.items.len()),
            group: self.get(id).cloned(),
        }
    }

    fn restore(&mut self, id: &GroupId, slot: Slot) {
        match (self.position(id), slot.group) {
            (Some(index), Some(group)) => self.items[index] = group,
            (Some(index), None) => {
                self.items.remove(index);
            }
            (None, Some(group)) => {
                let index = slot.index.min(self.items.len());
                self.items.insert(index, group);
            }
            (None, None) => {}
        }
    }

    fn begin(&mut self, request: RequestId, id: &GroupId) -> bool {
        let slot = self.snapshot(id);
        let applied = self.ledger.begin(id.clone(), request, slot);
        if !applied {
            tracing::debug!(%request, group = %id, "groups.begin.refused");
        }
        applied
    }

    fn changed(&self, ids: impl IntoIterator<Item = GroupId>) {
        let ids: BTreeSet<GroupId> = ids.into_iter().collect();
        if !ids.is_empty() {
            self.topics.trigger(Topic::Groups, StoreEvent::GroupsChanged(ids));
        }
    }

    /// Rolls back `request` on every group it is still the latest writer of
    fn revert(&mut self, request: RequestId, ids: &[GroupId], error: RequestError) {
        let mut reverted = Vec::new();
        for id in ids {
            if let Reconcile::Revert(slot) = self.ledger.fail(id, request) {
                self.restore(id, slot);
                reverted.push(id.clone());
            }
        }

        tracing::debug!(%request, reverted = reverted.len(), %error, "groups.revert");
        if reverted.is_empty() {
            return;
        }
        self.changed(reverted.iter().cloned());
        self.topics.trigger(
            Topic::Groups,
            StoreEvent::ActionFailed {
                request,
                ids: reverted,
                error,
            },
        );
    }

    // ---------------------------------------------------------------------
    // Assignment
    // ---------------------------------------------------------------------

    pub fn on_assign_to(&mut self, request: RequestId, id: &GroupId, assignee: Option<Actor>) {
        if !self.begin(request, id) {
            return;
        }
        if let Some(group) = self.get_mut(id) {
            group.assigned_to = assignee;
        }
        self.changed([id.clone()]);
    }

    /// Returns true if the server result was committed
    pub fn on_assign_to_success(&mut self, request: RequestId, id: &GroupId, server: Group) -> bool {
        let rebased = server.clone();
        let outcome = self.ledger.succeed(id, request, |slot| {
            slot.group = Some(carry_activity(rebased, slot.group.as_ref()));
        });

        if !outcome.is_commit() {
            tracing::debug!(%request, group = %id, ?outcome, "groups.assign.dropped");
            return false;
        }

        let mut group = carry_activity(server, self.get(id));
        let (kind, data) = match &group.assigned_to {
            Some(actor) => (
                ActivityType::Assigned,
                serde_json::json!({ "assignee": actor.reference().to_string(), "assigneeName": actor.name }),
            ),
            None => (ActivityType::Unassigned, serde_json::Value::Null),
        };
        group.push_activity(Activity {
            id: format!("assign-{}", request.value()),
            kind,
            data,
            date_created: Utc::now(),
            user: None,
        });
        self.upsert(group);
        self.changed([id.clone()]);
        true
    }

    pub fn on_assign_to_error(&mut self, request: RequestId, id: &GroupId, error: RequestError) {
        self.revert(request, std::slice::from_ref(id), error);
    }

    // ---------------------------------------------------------------------
    // Bulk update (status, bookmark, seen)
    // ---------------------------------------------------------------------

    pub fn on_update(&mut self, request: RequestId, ids: &[GroupId], patch: &GroupPatch) {
        let mut changed = Vec::new();
        for id in ids {
            if !self.begin(request, id) {
                continue;
            }
            if let Some(group) = self.get_mut(id) {
                group.apply(patch);
                changed.push(id.clone());
            }
        }
        self.changed(changed);
    }

    pub fn on_update_success(&mut self, request: RequestId, ids: &[GroupId], response: &GroupPatch) {
        let mut changed = Vec::new();
        for id in ids {
            let outcome = self.ledger.succeed(id, request, |slot| {
                if let Some(group) = slot.group.as_mut() {
                    group.apply(response);
                }
            });
            if outcome.is_commit() {
                if let Some(group) = self.get_mut(id) {
                    group.apply(response);
                    changed.push(id.clone());
                }
            }
        }
        self.changed(changed);
    }

    pub fn on_update_error(&mut self, request: RequestId, ids: &[GroupId], error: RequestError) {
        self.revert(request, ids, error);
    }

    // ---------------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------------

    pub fn on_delete(&mut self, request: RequestId, ids: &[GroupId]) {
        let mut changed = Vec::new();
        for id in ids {
            if !self.begin(request, id) {
                continue;
            }
            if let Some(index) = self.position(id) {
                self.items.remove(index);
                changed.push(id.clone());
            }
        }
        self.changed(changed);
    }

    pub fn on_delete_success(&mut self, request: RequestId, ids: &[GroupId]) {
        let mut changed = Vec::new();
        for id in ids {
            let outcome = self.ledger.succeed(id, request, |slot| slot.group = None);
            if outcome.is_commit() {
                if let Some(index) = self.position(id) {
                    self.items.remove(index);
                    changed.push(id.clone());
                }
            }
        }
        self.changed(changed);
    }

    pub fn on_delete_error(&mut self, request: RequestId, ids: &[GroupId], error: RequestError) {
        self.revert(request, ids, error);
    }

    // ---------------------------------------------------------------------
    // Merge
    // ---------------------------------------------------------------------

    /// Optimistically folds the groups into the one with the most events
    pub fn on_merge(&mut self, request: RequestId, ids: &[GroupId]) {
        let begun: Vec<GroupId> = ids
            .iter()
            .filter(|id| self.begin(request, id))
            .cloned()
            .collect();

        let present: Vec<&Group> = begun.iter().filter_map(|id| self.get(id)).collect();
        let Some(parent) = present
            .iter()
            .copied()
            .fold(None::<&Group>, |best, g| match best {
                Some(b) if b.count >= g.count => Some(b),
                _ => Some(g),
            })
            .map(|g| g.id.clone())
        else {
            return;
        };
        let total: u64 = present.iter().map(|g| g.count).sum();

        self.items
            .retain(|g| g.id == parent || !begun.contains(&g.id));
        if let Some(group) = self.get_mut(&parent) {
            group.count = total;
        }
        self.changed(begun);
    }

    pub fn on_merge_success(&mut self, request: RequestId, ids: &[GroupId], result: &MergeResult) {
        let mut baselines: HashMap<GroupId, Slot> = HashMap::new();
        for id in ids {
            let is_child = result.children.contains(id);
            let outcome = self.ledger.succeed(id, request, |slot| {
                if is_child {
                    slot.group = None;
                }
            });
            if let Reconcile::Commit(slot) = outcome {
                baselines.insert(id.clone(), slot);
            }
        }
        if baselines.is_empty() {
            return;
        }

        let total: u64 = baselines
            .values()
            .filter_map(|s| s.group.as_ref())
            .map(|g| g.count)
            .sum();

        for child in &result.children {
            if baselines.contains_key(child) {
                if let Some(index) = self.position(child) {
                    self.items.remove(index);
                }
            }
        }

        if let Some(slot) = baselines.get(&result.parent) {
            if let Some(mut parent) = slot.group.clone().or_else(|| self.get(&result.parent).cloned()) {
                parent.count = total;
                if self.position(&result.parent).is_none() {
                    let index = slot.index.min(self.items.len());
                    self.items.insert(index, parent);
                } else {
                    self.upsert(parent);
                }
            }
        }

        self.changed(baselines.into_keys());
    }

    pub fn on_merge_error(&mut self, request: RequestId, ids: &[GroupId], error: RequestError) {
        self.revert(request, ids, error);
    }

    // ---------------------------------------------------------------------
    // Notes
    // ---------------------------------------------------------------------

    /// Shows a note with a temporary ID until the server assigns one
    pub fn on_create_note(&mut self, request: RequestId, id: &GroupId, note: Activity) {
        if !self.begin(request, id) {
            return;
        }
        if let Some(group) = self.get_mut(id) {
            group.push_activity(note);
        }
        self.changed([id.clone()]);
    }

    pub fn on_create_note_success(
        &mut self,
        request: RequestId,
        id: &GroupId,
        temp_id: &str,
        note: Activity,
    ) -> bool {
        let rebased = note.clone();
        let outcome = self.ledger.succeed(id, request, |slot| {
            if let Some(group) = slot.group.as_mut() {
                group.push_activity(rebased);
            }
        });
        if !outcome.is_commit() {
            return false;
        }

        if let Some(group) = self.get_mut(id) {
            match group.activity_mut(temp_id) {
                Some(existing) => *existing = note,
                None => group.push_activity(note),
            }
        }
        self.changed([id.clone()]);
        true
    }

    pub fn on_create_note_error(&mut self, request: RequestId, id: &GroupId, error: RequestError) {
        self.revert(request, std::slice::from_ref(id), error);
    }

    pub fn on_update_note(&mut self, request: RequestId, id: &GroupId, note_id: &str, text: &str) {
        if !self.begin(request, id) {
            return;
        }
        if let Some(note) = self.get_mut(id).and_then(|g| g.activity_mut(note_id)) {
            note.data = serde_json::json!({ "text": text });
        }
        self.changed([id.clone()]);
    }

    pub fn on_update_note_success(&mut self, request: RequestId, id: &GroupId, note: Activity) {
        let rebased = note.clone();
        let outcome = self.ledger.succeed(id, request, |slot| {
            if let Some(existing) = slot.group.as_mut().and_then(|g| g.activity_mut(&rebased.id)) {
                *existing = rebased;
            }
        });
        if !outcome.is_commit() {
            return;
        }

        if let Some(existing) = self.get_mut(id).and_then(|g| g.activity_mut(&note.id)) {
            *existing = note;
        }
        self.changed([id.clone()]);
    }

    pub fn on_update_note_error(&mut self, request: RequestId, id: &GroupId, error: RequestError) {
        self.revert(request, std::slice::from_ref(id), error);
    }

    pub fn on_delete_note(&mut self, request: RequestId, id: &GroupId, note_id: &str) {
        if !self.begin(request, id) {
            return;
        }
        if let Some(group) = self.get_mut(id) {
            group.remove_activity(note_id);
        }
        self.changed([id.clone()]);
    }

    pub fn on_delete_note_success(&mut self, request: RequestId, id: &GroupId, note_id: &str) {
        let outcome = self.ledger.succeed(id, request, |slot| {
            if let Some(group) = slot.group.as_mut() {
                group.remove_activity(note_id);
            }
        });
        if outcome.is_commit() {
            if let Some(group) = self.get_mut(id) {
                group.remove_activity(note_id);
            }
            self.changed([id.clone()]);
        }
    }

    pub fn on_delete_note_error(&mut self, request: RequestId, id: &GroupId, error: RequestError) {
        self.revert(request, std::slice::from_ref(id), error);
    }
}
