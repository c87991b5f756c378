//! Session action creators: signed-in user and active organization

use super::ActionError;
use crate::api::{Client, RequestOptions};
use crate::domain::{Organization, User};
use crate::store::{StoreContext, GUIDES_FEATURE};

#[derive(Clone)]
pub struct ConfigActions {
    client: Client,
    stores: StoreContext,
}

impl ConfigActions {
    pub fn new(client: Client, stores: StoreContext) -> Self {
        Self { client, stores }
    }

    pub async fn fetch_user(&self) -> Result<User, ActionError> {
        let user: User = self
            .client
            .request_promise("/users/me/", RequestOptions::get())
            .await?;
        self.stores.config().lock().set_user(Some(user.clone()));
        Ok(user)
    }

    /// Loads an organization and makes it the active one
    ///
    /// The guide store follows the switch, including the guides feature flag.
    pub async fn switch_organization(&self, slug: &str) -> Result<Organization, ActionError> {
        if slug.trim().is_empty() {
            return Err(ActionError::Invalid("Organization slug cannot be empty".to_string()));
        }

        let path = format!("/organizations/{}/", slug);
        let org: Organization = self.client.request_promise(&path, RequestOptions::get()).await?;

        let guides_enabled = org.has_feature(GUIDES_FEATURE);
        self.stores.config().lock().set_organization(Some(org.clone()));
        self.stores
            .guides()
            .lock()
            .set_active_org(Some(org.slug.clone()), guides_enabled);

        tracing::debug!(org = %org.slug, guides_enabled, "config.organization");
        Ok(org)
    }

    pub fn switch_project(&self, slug: Option<String>) {
        self.stores.guides().lock().set_active_project(slug);
    }
}
