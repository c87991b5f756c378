//! Configuration store: who is signed in and which organization is active

use super::topics::{StoreEvent, Topic, Topics};
use crate::domain::{Organization, User};

/// Feature flag that enables onboarding guides
pub const GUIDES_FEATURE: &str = "guides";

pub struct ConfigStore {
    user: Option<User>,
    organization: Option<Organization>,
    topics: Topics,
}

impl ConfigStore {
    pub fn new(topics: Topics) -> Self {
        Self {
            user: None,
            organization: None,
            topics,
        }
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
        self.topics.trigger(Topic::Config, StoreEvent::ConfigChanged);
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn set_organization(&mut self, organization: Option<Organization>) {
        self.organization = organization;
        self.topics.trigger(Topic::Config, StoreEvent::ConfigChanged);
    }

    pub fn organization(&self) -> Option<&Organization> {
        self.organization.as_ref()
    }

    /// True if the active organization has `feature`
    pub fn has_feature(&self, feature: &str) -> bool {
        self.organization
            .as_ref()
            .is_some_and(|org| org.has_feature(feature))
    }
}
