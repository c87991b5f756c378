//! Guide action creators and asynchronous guide conditions

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::ActionError;
use crate::api::{Client, Query, RequestError, RequestOptions};
use crate::domain::guide::{merge_with_catalogue, ALERT_REMINDER_CONDITION};
use crate::domain::{AssistantEntry, GuideOutcome};
use crate::store::StoreContext;

const ASSISTANT: &str = "/assistant/";

/// Extra check a guide can require before it is shown
///
/// Conditions usually need server data, so they are evaluated by
/// [`GuideActions::evaluate_conditions`] and their results stored in the
/// guide store. A condition that has not reported yet does not hold.
#[async_trait]
pub trait GuideCondition: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, client: &Client, org: &str, project: &str) -> Result<bool, RequestError>;
}

/// Holds when a project receives events but has no alert rules
pub struct AlertReminderCondition {
    /// How far back to look for events
    pub window: Duration,
}

impl Default for AlertReminderCondition {
    fn default() -> Self {
        Self {
            window: Duration::days(30),
        }
    }
}

#[async_trait]
impl GuideCondition for AlertReminderCondition {
    fn name(&self) -> &str {
        ALERT_REMINDER_CONDITION
    }

    async fn evaluate(&self, client: &Client, org: &str, project: &str) -> Result<bool, RequestError> {
        let stats_path = format!("/projects/{}/{}/stats/", org, project);
        let rules_path = format!("/projects/{}/{}/rules/", org, project);
        let since = (Utc::now() - self.window).timestamp();

        let stats_query = Query::new().with("stat", "received").with("since", since);
        let (stats, rules) = tokio::join!(
            client.request_promise::<Vec<(i64, u64)>>(
                &stats_path,
                RequestOptions::get().with_query(stats_query)
            ),
            client.request_promise::<Vec<serde_json::Value>>(&rules_path, RequestOptions::get()),
        );

        let received: u64 = stats?.iter().map(|(_, count)| count).sum();
        let rules = rules?;
        tracing::debug!(project, received, rules = rules.len(), "guides.alert_reminder");

        Ok(received > 0 && rules.is_empty())
    }
}

/// Fetches guides and records how the user left them
#[derive(Clone)]
pub struct GuideActions {
    client: Client,
    stores: StoreContext,
    conditions: Vec<Arc<dyn GuideCondition>>,
}

impl GuideActions {
    /// Creates guide actions with the built-in conditions
    pub fn new(client: Client, stores: StoreContext) -> Self {
        Self {
            client,
            stores,
            conditions: vec![Arc::new(AlertReminderCondition::default())],
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<Arc<dyn GuideCondition>>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Loads the user's guide list into the guide store
    pub async fn fetch_guides(&self) -> Result<usize, ActionError> {
        let entries: Vec<AssistantEntry> = self
            .client
            .request_promise(ASSISTANT, RequestOptions::get())
            .await?;
        let guides = merge_with_catalogue(&entries);
        let count = guides.len();

        self.stores.guides().lock().fetch_succeeded(guides);
        Ok(count)
    }

    /// Evaluates every condition a fetched guide refers to
    ///
    /// Needs an active org and project; without them nothing is evaluated.
    /// A condition whose lookups fail is recorded as not holding. Results
    /// that arrive after the org or project changed are dropped.
    pub async fn evaluate_conditions(&self) {
        let (org, project, wanted) = {
            let store = self.stores.guides().lock();
            let wanted: Vec<String> = store
                .guides()
                .iter()
                .filter_map(|g| g.condition.clone())
                .collect();
            (
                store.org().map(str::to_string),
                store.project().map(str::to_string),
                wanted,
            )
        };
        let (Some(org), Some(project)) = (org, project) else {
            return;
        };

        for condition in self.conditions.iter().filter(|c| wanted.iter().any(|w| w == c.name())) {
            let holds = match condition.evaluate(&self.client, &org, &project).await {
                Ok(holds) => holds,
                Err(e) if e.is_cancelled() => return,
                Err(e) => {
                    tracing::warn!(condition = condition.name(), error = %e, "guides.condition.failed");
                    false
                }
            };
            let mut store = self.stores.guides().lock();
            if store.org() != Some(org.as_str()) || store.project() != Some(project.as_str()) {
                tracing::debug!(condition = condition.name(), %project, "guides.condition.outdated");
                return;
            }
            store.set_condition(condition.name(), holds);
        }
    }

    /// Closes the current guide and reports it to the server
    pub async fn close_guide(&self) -> Result<Option<(String, GuideOutcome)>, ActionError> {
        let closed = self.stores.guides().lock().close_guide();
        let Some((key, outcome)) = closed else {
            return Ok(None);
        };
        self.record_outcome(&key, outcome).await?;
        Ok(Some((key, outcome)))
    }

    /// Marks a guide seen without it being on screen
    pub async fn mark_guide(&self, key: &str, outcome: GuideOutcome) -> Result<(), ActionError> {
        if key.trim().is_empty() {
            return Err(ActionError::Invalid("Guide key cannot be empty".to_string()));
        }
        self.stores.guides().lock().mark_seen(key);
        self.record_outcome(key, outcome).await
    }

    async fn record_outcome(&self, key: &str, outcome: GuideOutcome) -> Result<(), ActionError> {
        let body = serde_json::json!({ "guide": key, "status": outcome.as_str() });
        self.client
            .request_with_response(ASSISTANT, RequestOptions::put(body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::Method;

    fn setup() -> (Arc<MockTransport>, GuideActions, StoreContext) {
        let mock = MockTransport::new();
        let stores = StoreContext::new();
        stores
            .guides()
            .lock()
            .set_active_org(Some("acme".to_string()), true);
        let actions = GuideActions::new(Client::new(mock.clone()), stores.clone());
        (mock, actions, stores)
    }

    fn stub_alert_lookups(mock: &MockTransport, events: u64, rules: serde_json::Value) {
        mock.add(
            Method::Get,
            "/projects/acme/web/stats/",
            200,
            serde_json::json!([[1714550400, events], [1714636800, 0]]),
        );
        mock.add(Method::Get, "/projects/acme/web/rules/", 200, rules);
    }

    #[tokio::test]
    async fn fetch_keeps_listed_guides() {
        let (mock, actions, stores) = setup();
        mock.add(
            Method::Get,
            ASSISTANT,
            200,
            serde_json::json!([{"guide": "issue", "seen": false}, {"guide": "unknown", "seen": false}]),
        );

        assert_eq!(actions.fetch_guides().await.unwrap(), 1);

        let mut store = stores.guides().lock();
        store.register_anchor("issue_title");
        store.register_anchor("exception");
        assert_eq!(store.current_guide().unwrap().key, "issue");
        assert_eq!(store.current_guide().unwrap().steps.len(), 2);
    }

    #[tokio::test]
    async fn alert_reminder_holds_without_rules() {
        let (mock, actions, stores) = setup();
        mock.add(
            Method::Get,
            ASSISTANT,
            200,
            serde_json::json!([{"guide": "alert_reminder", "seen": false}]),
        );
        stub_alert_lookups(&mock, 12, serde_json::json!([]));

        actions.fetch_guides().await.unwrap();
        {
            let mut store = stores.guides().lock();
            store.set_active_project(Some("web".to_string()));
            store.register_anchor("alerts_nav");
            assert!(store.current_guide().is_none());
        }

        actions.evaluate_conditions().await;

        assert_eq!(
            stores.guides().lock().current_guide().unwrap().key,
            "alert_reminder"
        );
        let stats = &mock.requests("/projects/acme/web/stats/")[0];
        assert_eq!(stats.query.values("stat"), vec!["received".to_string()]);
    }

    #[tokio::test]
    async fn alert_reminder_fails_with_rules() {
        let (mock, actions, stores) = setup();
        mock.add(
            Method::Get,
            ASSISTANT,
            200,
            serde_json::json!([{"guide": "alert_reminder", "seen": false}]),
        );
        stub_alert_lookups(&mock, 12, serde_json::json!([{"id": "1"}]));

        actions.fetch_guides().await.unwrap();
        stores
            .guides()
            .lock()
            .set_active_project(Some("web".to_string()));
        stores.guides().lock().register_anchor("alerts_nav");
        actions.evaluate_conditions().await;

        assert!(stores.guides().lock().current_guide().is_none());
    }

    #[tokio::test]
    async fn condition_result_after_project_switch_is_dropped() {
        let (mock, actions, stores) = setup();
        mock.add(
            Method::Get,
            ASSISTANT,
            200,
            serde_json::json!([{"guide": "alert_reminder", "seen": false}]),
        );
        let stats = mock.defer(Method::Get, "/projects/acme/web/stats/");
        mock.add(Method::Get, "/projects/acme/web/rules/", 200, serde_json::json!([]));

        actions.fetch_guides().await.unwrap();
        {
            let mut store = stores.guides().lock();
            store.set_active_project(Some("web".to_string()));
            store.register_anchor("alerts_nav");
        }

        let task = tokio::spawn({
            let actions = actions.clone();
            async move { actions.evaluate_conditions().await }
        });
        mock.wait_for_calls("/projects/acme/web/stats/", 1).await;

        stores
            .guides()
            .lock()
            .set_active_project(Some("api".to_string()));
        stats
            .send(crate::api::ApiResponse::with_status(
                200,
                serde_json::json!([[1714550400, 12]]),
            ))
            .unwrap();
        task.await.unwrap();

        assert!(stores.guides().lock().current_guide().is_none());
    }

    #[tokio::test]
    async fn conditions_need_a_project() {
        let (mock, actions, _) = setup();
        mock.add(
            Method::Get,
            ASSISTANT,
            200,
            serde_json::json!([{"guide": "alert_reminder", "seen": false}]),
        );
        actions.fetch_guides().await.unwrap();
        actions.evaluate_conditions().await;

        assert_eq!(mock.calls("/projects/acme/web/stats/"), 0);
    }

    #[tokio::test]
    async fn close_reports_outcome() {
        let (mock, actions, stores) = setup();
        mock.add(
            Method::Get,
            ASSISTANT,
            200,
            serde_json::json!([{"guide": "issue_stream", "seen": false}]),
        );
        mock.add(Method::Put, ASSISTANT, 200, serde_json::json!({}));

        actions.fetch_guides().await.unwrap();
        stores.guides().lock().register_anchor("issue_stream");

        let (key, outcome) = actions.close_guide().await.unwrap().unwrap();
        assert_eq!(key, "issue_stream");
        assert_eq!(outcome, GuideOutcome::Viewed);

        let put = mock
            .requests(ASSISTANT)
            .into_iter()
            .find(|r| r.method == Method::Put)
            .unwrap();
        assert_eq!(
            put.body,
            Some(serde_json::json!({"guide": "issue_stream", "status": "viewed"}))
        );
        assert!(stores.guides().lock().current_guide().is_none());
    }

    #[tokio::test]
    async fn close_without_guide_sends_nothing() {
        let (mock, actions, _) = setup();
        assert!(actions.close_guide().await.unwrap().is_none());
        assert_eq!(mock.calls(ASSISTANT), 0);
    }

    #[tokio::test]
    async fn mark_guide_rejects_empty_key() {
        let (mock, actions, _) = setup();
        let err = actions.mark_guide(" ", GuideOutcome::Dismissed).await.unwrap_err();
        assert!(matches!(err, ActionError::Invalid(_)));
        assert_eq!(mock.calls(ASSISTANT), 0);
    }
}
