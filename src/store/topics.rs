//! Topic-keyed change notifications
//!
//! Stores publish on their topic after every mutation; views and commands
//! subscribe to the topics they render. Publishing never blocks and never
//! fails: events sent while nobody listens are dropped, and slow receivers
//! see `Lagged` rather than stalling the store.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::api::RequestError;
use crate::domain::{GroupId, RequestId};

const CHANNEL_CAPACITY: usize = 64;

/// What a subscriber listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Groups,
    Guides,
    Config,
}

/// A store change
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Groups whose visible state changed
    GroupsChanged(BTreeSet<GroupId>),

    /// An optimistic write was rolled back
    ActionFailed {
        request: RequestId,
        ids: Vec<GroupId>,
        error: RequestError,
    },

    GuidesChanged,

    ConfigChanged,
}

/// Broadcast channels, one per topic
#[derive(Debug, Clone)]
pub struct Topics {
    channels: Arc<HashMap<Topic, broadcast::Sender<StoreEvent>>>,
}

impl Default for Topics {
    fn default() -> Self {
        Self::new()
    }
}

impl Topics {
    pub fn new() -> Self {
        let channels = [Topic::Groups, Topic::Guides, Topic::Config]
            .into_iter()
            .map(|topic| (topic, broadcast::channel(CHANNEL_CAPACITY).0))
            .collect();
        Self {
            channels: Arc::new(channels),
        }
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<StoreEvent> {
        self.channels[&topic].subscribe()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.channels[&topic].receiver_count()
    }

    /// Publishes an event to every current subscriber of `topic`
    pub fn trigger(&self, topic: Topic, event: StoreEvent) {
        tracing::trace!(?topic, ?event, "store.trigger");
        // No receivers is not an error for a store
        let _ = self.channels[&topic].send(event);
    }
}
