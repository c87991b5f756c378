//! Group (issue) action creators

use serde::Deserialize;

use super::{encode_body, ActionError};
use crate::api::{Client, Query, RequestOptions};
use crate::domain::{unique_id, Activity, Actor, Group, GroupId, GroupPatch, MergeResult};
use crate::store::StoreContext;

#[derive(Debug, Deserialize)]
struct MergeResponse {
    merge: MergeResult,
}

/// Writes to groups of one organization
#[derive(Clone)]
pub struct GroupActions {
    client: Client,
    stores: StoreContext,
    org: String,
}

impl GroupActions {
    pub fn new(client: Client, stores: StoreContext, org: impl Into<String>) -> Self {
        Self {
            client,
            stores,
            org: org.into(),
        }
    }

    fn issue_path(&self, id: &GroupId) -> String {
        format!("/organizations/{}/issues/{}/", self.org, id)
    }

    fn bulk_path(&self) -> String {
        format!("/organizations/{}/issues/", self.org)
    }

    fn bulk_query(ids: &[GroupId]) -> Query {
        Query::new().with_repeated("id", ids.iter().map(|id| id.as_str()))
    }

    fn require_ids(ids: &[GroupId], min: usize, what: &str) -> Result<(), ActionError> {
        if ids.len() < min {
            return Err(ActionError::Invalid(format!(
                "{} needs at least {} issue ID{}",
                what,
                min,
                if min == 1 { "" } else { "s" }
            )));
        }
        Ok(())
    }

    fn require_text(text: &str) -> Result<(), ActionError> {
        if text.trim().is_empty() {
            return Err(ActionError::Invalid("Note text cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Assigns a group to a user or team, or clears the assignee
    pub async fn assign_to(&self, id: &GroupId, assignee: Option<Actor>) -> Result<Group, ActionError> {
        let request = unique_id();
        let body = serde_json::json!({
            "assignedTo": assignee
                .as_ref()
                .map(|a| a.reference().to_string())
                .unwrap_or_default(),
        });

        self.stores.groups().lock().on_assign_to(request, id, assignee);

        let result = self
            .client
            .request_promise::<Group>(&self.issue_path(id), RequestOptions::put(body))
            .await;

        match result {
            Ok(group) => {
                self.stores
                    .groups()
                    .lock()
                    .on_assign_to_success(request, id, group.clone());
                Ok(group)
            }
            Err(e) => {
                self.stores.groups().lock().on_assign_to_error(request, id, e.clone());
                Err(e.into())
            }
        }
    }

    /// Applies a status, bookmark or seen change to several groups
    pub async fn bulk_update(&self, ids: &[GroupId], patch: GroupPatch) -> Result<GroupPatch, ActionError> {
        Self::require_ids(ids, 1, "Update")?;
        if patch.is_empty() {
            return Err(ActionError::Invalid("Nothing to update".to_string()));
        }

        let body = encode_body(&patch)?;
        let request = unique_id();
        self.stores.groups().lock().on_update(request, ids, &patch);

        let options = RequestOptions::put(body).with_query(Self::bulk_query(ids));
        let result = self
            .client
            .request_promise::<GroupPatch>(&self.bulk_path(), options)
            .await;

        match result {
            Ok(response) => {
                // An empty answer confirms the patch as sent
                let confirmed = if response.is_empty() { patch } else { response };
                self.stores
                    .groups()
                    .lock()
                    .on_update_success(request, ids, &confirmed);
                Ok(confirmed)
            }
            Err(e) => {
                self.stores.groups().lock().on_update_error(request, ids, e.clone());
                Err(e.into())
            }
        }
    }

    pub async fn bulk_delete(&self, ids: &[GroupId]) -> Result<(), ActionError> {
        Self::require_ids(ids, 1, "Delete")?;

        let request = unique_id();
        self.stores.groups().lock().on_delete(request, ids);

        let options = RequestOptions::delete().with_query(Self::bulk_query(ids));
        match self.client.request_with_response(&self.bulk_path(), options).await {
            Ok(_) => {
                self.stores.groups().lock().on_delete_success(request, ids);
                Ok(())
            }
            Err(e) => {
                self.stores.groups().lock().on_delete_error(request, ids, e.clone());
                Err(e.into())
            }
        }
    }

    /// Merges groups; the server picks the surviving parent
    pub async fn merge(&self, ids: &[GroupId]) -> Result<MergeResult, ActionError> {
        Self::require_ids(ids, 2, "Merge")?;

        let request = unique_id();
        self.stores.groups().lock().on_merge(request, ids);

        let options =
            RequestOptions::put(serde_json::json!({ "merge": 1 })).with_query(Self::bulk_query(ids));
        let result = self
            .client
            .request_promise::<MergeResponse>(&self.bulk_path(), options)
            .await;

        match result {
            Ok(MergeResponse { merge }) => {
                self.stores.groups().lock().on_merge_success(request, ids, &merge);
                Ok(merge)
            }
            Err(e) => {
                self.stores.groups().lock().on_merge_error(request, ids, e.clone());
                Err(e.into())
            }
        }
    }

    pub async fn create_note(
        &self,
        id: &GroupId,
        text: &str,
        author: Option<Actor>,
    ) -> Result<Activity, ActionError> {
        Self::require_text(text)?;

        let request = unique_id();
        let temp_id = format!("temp-{}", request.value());
        self.stores
            .groups()
            .lock()
            .on_create_note(request, id, Activity::note(temp_id.clone(), text, author));

        let path = format!("{}comments/", self.issue_path(id));
        let result = self
            .client
            .request_promise::<Activity>(&path, RequestOptions::post(serde_json::json!({ "text": text })))
            .await;

        match result {
            Ok(note) => {
                self.stores
                    .groups()
                    .lock()
                    .on_create_note_success(request, id, &temp_id, note.clone());
                Ok(note)
            }
            Err(e) => {
                self.stores.groups().lock().on_create_note_error(request, id, e.clone());
                Err(e.into())
            }
        }
    }

    pub async fn update_note(&self, id: &GroupId, note_id: &str, text: &str) -> Result<Activity, ActionError> {
        Self::require_text(text)?;

        let request = unique_id();
        self.stores
            .groups()
            .lock()
            .on_update_note(request, id, note_id, text);

        let path = format!("{}comments/{}/", self.issue_path(id), note_id);
        let result = self
            .client
            .request_promise::<Activity>(&path, RequestOptions::put(serde_json::json!({ "text": text })))
            .await;

        match result {
            Ok(note) => {
                self.stores
                    .groups()
                    .lock()
                    .on_update_note_success(request, id, note.clone());
                Ok(note)
            }
            Err(e) => {
                self.stores.groups().lock().on_update_note_error(request, id, e.clone());
                Err(e.into())
            }
        }
    }

    pub async fn delete_note(&self, id: &GroupId, note_id: &str) -> Result<(), ActionError> {
        let request = unique_id();
        self.stores.groups().lock().on_delete_note(request, id, note_id);

        let path = format!("{}comments/{}/", self.issue_path(id), note_id);
        match self.client.request_with_response(&path, RequestOptions::delete()).await {
            Ok(_) => {
                self.stores
                    .groups()
                    .lock()
                    .on_delete_note_success(request, id, note_id);
                Ok(())
            }
            Err(e) => {
                self.stores.groups().lock().on_delete_note_error(request, id, e.clone());
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::Method;
    use crate::domain::{ActorKind, GroupStatus};
    use crate::store::{EntityState, StoreEvent, Topic};

    const ISSUES: &str = "/organizations/acme/issues/";

    fn group_json(id: &str, count: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "shortId": format!("WEB-{}", id),
            "title": format!("Error {}", id),
            "count": count.to_string(),
            "status": "unresolved",
        })
    }

    fn setup(groups: &[(&str, u64)]) -> (std::sync::Arc<MockTransport>, GroupActions, StoreContext) {
        let mock = MockTransport::new();
        let stores = StoreContext::new();
        stores.groups().lock().load_initial_data(
            groups
                .iter()
                .map(|(id, count)| serde_json::from_value(group_json(id, *count)).unwrap())
                .collect(),
        );
        let actions = GroupActions::new(Client::new(mock.clone()), stores.clone(), "acme");
        (mock, actions, stores)
    }

    fn gid(id: &str) -> GroupId {
        id.parse().unwrap()
    }

    fn alice() -> Actor {
        Actor {
            id: "10".to_string(),
            name: "Alice".to_string(),
            kind: ActorKind::User,
            email: None,
        }
    }

    #[tokio::test]
    async fn assign_sends_actor_reference() {
        let (mock, actions, stores) = setup(&[("1", 1)]);
        let mut server = group_json("1", 1);
        server["assignedTo"] = serde_json::json!({"id": "10", "name": "Alice", "type": "user"});
        mock.add(Method::Put, "/organizations/acme/issues/1/", 200, server);

        actions.assign_to(&gid("1"), Some(alice())).await.unwrap();

        let sent = mock.requests("/organizations/acme/issues/1/");
        assert_eq!(sent[0].body, Some(serde_json::json!({"assignedTo": "user:10"})));

        let groups = stores.groups().lock();
        let group = groups.get(&gid("1")).unwrap();
        assert_eq!(group.assigned_to.as_ref().unwrap().name, "Alice");
        assert_eq!(group.activity.len(), 1);
    }

    #[tokio::test]
    async fn assign_is_visible_before_response() {
        let (mock, actions, stores) = setup(&[("1", 1)]);
        let reply = mock.defer(Method::Put, "/organizations/acme/issues/1/");

        let task = tokio::spawn({
            let actions = actions.clone();
            async move { actions.assign_to(&gid("1"), Some(alice())).await }
        });
        mock.wait_for_calls("/organizations/acme/issues/1/", 1).await;

        assert!(stores.groups().lock().get(&gid("1")).unwrap().assigned_to.is_some());
        assert!(stores.groups().lock().state(&gid("1")).is_pending());

        reply
            .send(crate::api::ApiResponse::with_status(403, serde_json::json!({"detail": "nope"})))
            .unwrap();
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, ActionError::Request(ref e) if e.status() == Some(403)));
        assert!(stores.groups().lock().get(&gid("1")).unwrap().assigned_to.is_none());
    }

    #[tokio::test]
    async fn bulk_update_uses_repeated_ids() {
        let (mock, actions, stores) = setup(&[("1", 1), ("2", 1)]);
        mock.add(Method::Put, ISSUES, 200, serde_json::json!({"status": "resolved"}));

        actions
            .bulk_update(&[gid("1"), gid("2")], GroupPatch::status(GroupStatus::Resolved))
            .await
            .unwrap();

        let sent = &mock.requests(ISSUES)[0];
        assert_eq!(sent.query.encode(), "id=1&id=2");
        assert_eq!(sent.body, Some(serde_json::json!({"status": "resolved"})));
        assert!(stores
            .groups()
            .lock()
            .get_all()
            .iter()
            .all(|g| g.status == GroupStatus::Resolved));
    }

    #[tokio::test]
    async fn bulk_update_failure_notifies() {
        let (mock, actions, stores) = setup(&[("1", 1)]);
        let mut rx = stores.subscribe(Topic::Groups);
        mock.add(Method::Put, ISSUES, 500, serde_json::json!({"detail": "boom"}));

        let err = actions
            .bulk_update(&[gid("1")], GroupPatch::bookmark(true))
            .await
            .unwrap_err();
        assert!(!err.is_cancelled());
        assert!(!stores.groups().lock().get(&gid("1")).unwrap().is_bookmarked);

        let mut failed = false;
        while let Ok(event) = rx.try_recv() {
            failed |= matches!(event, StoreEvent::ActionFailed { .. });
        }
        assert!(failed);
    }

    #[tokio::test]
    async fn merge_needs_two_ids() {
        let (mock, actions, _) = setup(&[("1", 1)]);

        let err = actions.merge(&[gid("1")]).await.unwrap_err();
        assert!(matches!(err, ActionError::Invalid(_)));
        assert_eq!(mock.calls(ISSUES), 0);
    }

    #[tokio::test]
    async fn merge_commits_server_parent() {
        let (mock, actions, stores) = setup(&[("1", 3), ("2", 4)]);
        mock.add(
            Method::Put,
            ISSUES,
            200,
            serde_json::json!({"merge": {"parent": "1", "children": ["2"]}}),
        );

        let result = actions.merge(&[gid("1"), gid("2")]).await.unwrap();
        assert_eq!(result.parent, gid("1"));

        let groups = stores.groups().lock();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get(&gid("1")).unwrap().count, 7);
    }

    #[tokio::test]
    async fn empty_note_is_rejected() {
        let (mock, actions, stores) = setup(&[("1", 1)]);

        let err = actions.create_note(&gid("1"), "   ", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Note text cannot be empty");
        assert_eq!(mock.calls("/organizations/acme/issues/1/comments/"), 0);
        assert_eq!(stores.groups().lock().state(&gid("1")), EntityState::Clean);
    }

    #[tokio::test]
    async fn note_replaces_temporary_entry() {
        let (mock, actions, stores) = setup(&[("1", 1)]);
        mock.add(
            Method::Post,
            "/organizations/acme/issues/1/comments/",
            201,
            serde_json::json!({
                "id": "900",
                "type": "note",
                "data": {"text": "looking"},
                "dateCreated": "2024-05-01T10:00:00Z"
            }),
        );

        let note = actions.create_note(&gid("1"), "looking", None).await.unwrap();
        assert_eq!(note.id, "900");

        let groups = stores.groups().lock();
        let group = groups.get(&gid("1")).unwrap();
        assert_eq!(group.activity.len(), 1);
        assert_eq!(group.activity[0].id, "900");
    }

    #[tokio::test]
    async fn delete_note_sends_delete() {
        let (mock, actions, stores) = setup(&[("1", 1)]);
        stores.groups().lock().add(vec![{
            let mut g: Group = serde_json::from_value(group_json("1", 1)).unwrap();
            g.push_activity(Activity::note("900", "looking", None));
            g
        }]);
        mock.add(
            Method::Delete,
            "/organizations/acme/issues/1/comments/900/",
            204,
            serde_json::Value::Null,
        );

        actions.delete_note(&gid("1"), "900").await.unwrap();
        assert!(stores.groups().lock().get(&gid("1")).unwrap().activity.is_empty());
    }
}
