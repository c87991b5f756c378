//! Per-entity record of optimistic writes
//!
//! Every optimistic mutation registers its [`RequestId`] as a writer of each
//! entity it touches, together with the value that was visible just before
//! its patch. When the network answers, the ledger decides what the answer
//! may do:
//!
//! | Answer | Writer | Outcome |
//! |--------|--------|---------|
//! | success | newest outstanding | [`Reconcile::Commit`] |
//! | success | already confirmed by this ID | [`Reconcile::Duplicate`] |
//! | success | a newer write is outstanding | [`Reconcile::Superseded`], baseline rebased |
//! | error | newest outstanding | [`Reconcile::Revert`] with the value seen before this write |
//! | error | a newer write is outstanding | [`Reconcile::Superseded`] |
//! | anything else | | [`Reconcile::Stale`] |
//!
//! The baseline is the last server-known value of the entity: captured when
//! the first of a run of optimistic writes starts, and rebased when a
//! superseded write is confirmed by the server. When the newest write fails
//! while older ones are still outstanding, the entity goes back to the value
//! the older writes produced and they stay live: their answers still count.

use std::collections::HashMap;
use std::hash::Hash;

use crate::domain::RequestId;

/// Write state of one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityState {
    #[default]
    Clean,
    Pending(RequestId),
    Confirmed(RequestId),
    RolledBack(RequestId),
}

impl EntityState {
    /// Request that last moved the entity out of `Clean`
    pub fn request(&self) -> Option<RequestId> {
        match self {
            EntityState::Clean => None,
            EntityState::Pending(r) | EntityState::Confirmed(r) | EntityState::RolledBack(r) => {
                Some(*r)
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntityState::Pending(_))
    }
}

/// What a network answer is allowed to do
#[derive(Debug, Clone, PartialEq)]
pub enum Reconcile<V> {
    /// Apply the server result; carries the baseline for reference
    Commit(V),
    /// Already committed for this request; do nothing
    Duplicate,
    /// A newer write is pending; visible state stays as is
    Superseded,
    /// Older than what is already settled; drop it
    Stale,
    /// Restore this value
    Revert(V),
}

impl<V> Reconcile<V> {
    pub fn is_commit(&self) -> bool {
        matches!(self, Reconcile::Commit(_))
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    state: EntityState,
    baseline: Option<V>,
    /// Outstanding writes, oldest first, each with the value visible before it
    writers: Vec<(RequestId, V)>,
    /// Newest request ever begun on this entity
    newest: Option<RequestId>,
}

impl<V> Entry<V> {
    fn position(&self, request: RequestId) -> Option<usize> {
        self.writers.iter().position(|(r, _)| *r == request)
    }

    fn is_newest_writer(&self, index: usize) -> bool {
        index + 1 == self.writers.len()
    }
}

/// Pending writers and baselines, keyed by entity
#[derive(Debug, Clone)]
pub struct PendingLedger<K, V> {
    entries: HashMap<K, Entry<V>>,
}

impl<K, V> Default for PendingLedger<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, V> PendingLedger<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: &K) -> EntityState {
        self.entries.get(key).map(|e| e.state).unwrap_or_default()
    }

    /// Number of entities with a pending write
    pub fn pending_count(&self) -> usize {
        self.entries.values().filter(|e| e.state.is_pending()).count()
    }

    /// Registers `request` as the newest writer of `key`
    ///
    /// `current` is the visible value just before the optimistic patch; it
    /// becomes the baseline unless an earlier write is still outstanding.
    /// Returns false, and records nothing, if a newer request already wrote
    /// the entity; the caller must then skip its patch.
    pub fn begin(&mut self, key: K, request: RequestId, current: V) -> bool {
        let entry = self.entries.entry(key).or_insert(Entry {
            state: EntityState::Clean,
            baseline: None,
            writers: Vec::new(),
            newest: None,
        });

        if entry.newest.is_some_and(|newest| newest >= request) {
            return false;
        }

        if entry.writers.is_empty() {
            entry.baseline = Some(current.clone());
        }
        entry.writers.push((request, current));
        entry.newest = Some(request);
        entry.state = EntityState::Pending(request);
        true
    }

    /// Reconciles a successful answer
    ///
    /// `rebase` applies the server's result to the baseline when the answer
    /// arrives for a superseded write.
    pub fn succeed(
        &mut self,
        key: &K,
        request: RequestId,
        rebase: impl FnOnce(&mut V),
    ) -> Reconcile<V> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Reconcile::Stale;
        };

        if entry.state == EntityState::Confirmed(request) {
            return Reconcile::Duplicate;
        }
        let Some(index) = entry.position(request) else {
            return Reconcile::Stale;
        };

        if entry.is_newest_writer(index) {
            // Older writes still in flight are settled by this answer
            entry.writers.clear();
            entry.state = EntityState::Confirmed(request);
            return match entry.baseline.take() {
                Some(baseline) => Reconcile::Commit(baseline),
                None => Reconcile::Stale,
            };
        }

        // This write and everything older are now server-known
        entry.writers.drain(..=index);
        if let Some(baseline) = entry.baseline.as_mut() {
            rebase(baseline);
            if let Some((_, before)) = entry.writers.first_mut() {
                *before = baseline.clone();
            }
        }
        Reconcile::Superseded
    }

    /// Reconciles a failed answer
    pub fn fail(&mut self, key: &K, request: RequestId) -> Reconcile<V> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Reconcile::Stale;
        };
        let Some(index) = entry.position(request) else {
            return Reconcile::Stale;
        };

        let (_, before) = entry.writers.remove(index);
        if index < entry.writers.len() {
            // The next write was layered on a patch the server refused
            entry.writers[index].1 = before;
            return Reconcile::Superseded;
        }

        match entry.writers.last() {
            Some((older, _)) => entry.state = EntityState::Pending(*older),
            None => {
                entry.state = EntityState::RolledBack(request);
                entry.baseline = None;
            }
        }
        Reconcile::Revert(before)
    }

    /// Forgets every entity
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn forget(&mut self, key: &K) {
        self.entries.remove(key);
    }
}
