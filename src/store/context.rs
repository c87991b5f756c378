//! Shared store handle
//!
//! One [`StoreContext`] is built per session and handed to actions, views and
//! commands. Clones share the same stores and notification channels.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::config_store::ConfigStore;
use super::group_store::GroupStore;
use super::guide_store::GuideStore;
use super::topics::{StoreEvent, Topic, Topics};

struct Inner {
    groups: Mutex<GroupStore>,
    guides: Mutex<GuideStore>,
    config: Mutex<ConfigStore>,
    topics: Topics,
}

#[derive(Clone)]
pub struct StoreContext {
    inner: Arc<Inner>,
}

impl Default for StoreContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreContext {
    pub fn new() -> Self {
        let topics = Topics::new();
        Self {
            inner: Arc::new(Inner {
                groups: Mutex::new(GroupStore::new(topics.clone())),
                guides: Mutex::new(GuideStore::new(topics.clone())),
                config: Mutex::new(ConfigStore::new(topics.clone())),
                topics,
            }),
        }
    }

    pub fn groups(&self) -> &Mutex<GroupStore> {
        &self.inner.groups
    }

    pub fn guides(&self) -> &Mutex<GuideStore> {
        &self.inner.guides
    }

    pub fn config(&self) -> &Mutex<ConfigStore> {
        &self.inner.config
    }

    pub fn topics(&self) -> &Topics {
        &self.inner.topics
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<StoreEvent> {
        self.inner.topics.subscribe(topic)
    }
}
