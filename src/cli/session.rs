//! Per-invocation session: resolved settings, API client and stores

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::actions::{ConfigActions, GroupActions, GuideActions};
use crate::api::{Client, HttpTransport, ReplayTransport, Transport};
use crate::config::{Config, Effective};
use crate::controller::AsyncController;
use crate::store::StoreContext;

pub struct Session {
    settings: Effective,
    client: Client,
    stores: StoreContext,
}

impl Session {
    /// Opens a session against the configured server, or against a fixture
    /// file when `replay` is given
    pub fn open(config: &Config, replay: Option<&Path>) -> Result<Self> {
        let settings = config.effective()?;

        let transport: Arc<dyn Transport> = match replay {
            Some(path) => {
                tracing::debug!(fixtures = %path.display(), "session.replay");
                Arc::new(ReplayTransport::from_file(path)?)
            }
            None => {
                tracing::debug!(url = %settings.url, "session.http");
                Arc::new(HttpTransport::new(&settings.url, settings.token.clone())?)
            }
        };

        Ok(Self {
            settings,
            client: Client::new(transport),
            stores: StoreContext::new(),
        })
    }

    pub fn settings(&self) -> &Effective {
        &self.settings
    }

    pub fn stores(&self) -> &StoreContext {
        &self.stores
    }

    /// Returns the active organization slug
    pub fn org(&self) -> Result<&str> {
        self.settings.org.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "No organization configured. Pass --org, set LOOKOUT_ORG or run 'lookout init --org <slug>'"
            )
        })
    }

    /// Project from the flag, falling back to the workspace default
    pub fn project(&self, flag: Option<String>) -> Option<String> {
        flag.or_else(|| self.settings.project.clone())
    }

    pub fn controller(&self) -> AsyncController {
        AsyncController::new(&self.client)
    }

    pub fn group_actions(&self) -> Result<GroupActions> {
        Ok(GroupActions::new(
            self.client.fork(),
            self.stores.clone(),
            self.org()?,
        ))
    }

    pub fn guide_actions(&self) -> GuideActions {
        GuideActions::new(self.client.fork(), self.stores.clone())
    }

    pub fn config_actions(&self) -> ConfigActions {
        ConfigActions::new(self.client.fork(), self.stores.clone())
    }
}
