//! Issue stream: saved-search tabs with counts, issue rows and paging

use std::collections::BTreeMap;

use super::{failed_section, Screen};
use crate::api::Query;
use crate::controller::{AsyncView, EndpointSpec, FetchState};
use crate::domain::Group;
use crate::store::StoreContext;

/// Tabs shown above the stream: label and search query
pub const SAVED_SEARCHES: &[(&str, &str)] = &[
    ("All Unresolved", "is:unresolved"),
    ("Assigned to Me", "is:unresolved assigned:me"),
    ("Bookmarked", "is:unresolved bookmarks:me"),
];

const CUSTOM_SEARCH: &str = "Custom Search";

pub struct IssueListView {
    pub org: String,
    pub query: String,
    pub project: Option<String>,
    pub cursor: Option<String>,
    pub limit: u32,
    stores: StoreContext,
}

impl IssueListView {
    pub fn new(org: impl Into<String>, query: impl Into<String>, stores: StoreContext) -> Self {
        Self {
            org: org.into(),
            query: query.into(),
            project: None,
            cursor: None,
            limit: 25,
            stores,
        }
    }

    /// Tabs for this view: the saved searches plus the current query if it
    /// is not one of them
    fn tabs(&self) -> Vec<(&str, &str)> {
        let mut tabs: Vec<(&str, &str)> = SAVED_SEARCHES.to_vec();
        if !SAVED_SEARCHES.iter().any(|(_, q)| *q == self.query) {
            tabs.push((CUSTOM_SEARCH, self.query.as_str()));
        }
        tabs
    }

    /// Moves the fetched issues into the group store
    pub fn load_results(&self, state: &FetchState) {
        if let Some(groups) = state.decode::<Vec<Group>>("issues") {
            self.stores.groups().lock().load_initial_data(groups);
        }
    }

    fn row(group: &Group) -> String {
        let assignee = group
            .assigned_to
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("-");
        format!(
            "{:<12} {:>7} {:>6} {:<10} {:<12} {}",
            group.short_id,
            group.count,
            group.user_count,
            group.status.as_str(),
            assignee,
            group.title
        )
    }
}

impl AsyncView for IssueListView {
    type Output = Screen;

    fn endpoints(&self) -> Vec<EndpointSpec> {
        let issues = Query::new()
            .with("query", &self.query)
            .with("limit", self.limit)
            .with_opt("cursor", self.cursor.as_ref())
            .with_opt("project", self.project.as_ref());

        let counts = Query::new()
            .with_repeated("query", self.tabs().into_iter().map(|(_, q)| q))
            .with_opt("project", self.project.as_ref());

        vec![
            EndpointSpec::new("issues", format!("/organizations/{}/issues/", self.org))
                .with_query(issues)
                .critical(),
            EndpointSpec::new("counts", format!("/organizations/{}/issues-count/", self.org))
                .with_query(counts),
        ]
    }

    fn render_loading(&self) -> Screen {
        Screen::loading()
    }

    fn render_error(&self, state: &FetchState) -> Screen {
        Screen::error("issues", state)
    }

    fn render_body(&self, state: &FetchState) -> Screen {
        let counts: Option<BTreeMap<String, u64>> = state.decode("counts");
        let mut lines = Vec::new();

        let mut tabs_json = Vec::new();
        let mut labels = Vec::new();
        for (label, query) in self.tabs() {
            let count = counts.as_ref().and_then(|c| c.get(query).copied());
            let text = match count {
                Some(n) => format!("{} {}", label, n),
                None => label.to_string(),
            };
            let selected = query == self.query;
            labels.push(format!("{} {}", if selected { "*" } else { " " }, text));
            tabs_json.push(serde_json::json!({
                "label": label,
                "text": text,
                "query": query,
                "count": count,
                "selected": selected,
            }));
        }
        lines.push(labels.join("   "));
        if state.error("counts").is_some() {
            lines.push(failed_section("issue counts"));
        }
        lines.push(String::new());

        let groups = self.stores.groups().lock().get_all().to_vec();
        if groups.is_empty() {
            lines.push("No issues match your search.".to_string());
        } else {
            lines.push(format!(
                "{:<12} {:>7} {:>6} {:<10} {:<12} TITLE",
                "ID", "EVENTS", "USERS", "STATUS", "ASSIGNEE"
            ));
            lines.push("-".repeat(70));
            lines.extend(groups.iter().map(Self::row));
        }

        let links = state.page_links("issues").unwrap_or_default();
        if let Some(cursor) = links.previous_cursor() {
            lines.push(format!("Previous page: --cursor {}", cursor));
        }
        if let Some(cursor) = links.next_cursor() {
            lines.push(format!("Next page: --cursor {}", cursor));
        }

        let errors: BTreeMap<&str, String> = state.errors().map(|(k, e)| (k, e.to_string())).collect();
        Screen {
            lines,
            data: serde_json::json!({
                "query": self.query,
                "tabs": tabs_json,
                "issues": groups,
                "previous": links.previous_cursor(),
                "next": links.next_cursor(),
                "errors": errors,
            }),
            failed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::{ApiResponse, Client, Method};
    use crate::controller::{AsyncController, Phase};

    const ISSUES: &str = "/organizations/acme/issues/";
    const COUNTS: &str = "/organizations/acme/issues-count/";

    fn one_issue() -> serde_json::Value {
        serde_json::json!([{
            "id": "1",
            "shortId": "WEB-1",
            "title": "TypeError: undefined is not a function",
            "status": "unresolved",
            "count": "14",
            "userCount": 3
        }])
    }

    async fn render(controller: &AsyncController, view: &IssueListView) -> Screen {
        controller.settled().await;
        let state = controller.state();
        view.load_results(&state);
        view.render(&state)
    }

    #[tokio::test]
    async fn unresolved_tab_shows_count() {
        let mock = MockTransport::new();
        mock.add(Method::Get, ISSUES, 200, one_issue());
        mock.add(Method::Get, COUNTS, 200, serde_json::json!({"is:unresolved": 1}));
        let stores = StoreContext::new();
        let controller = AsyncController::new(&Client::new(mock.clone()));
        let view = IssueListView::new("acme", "is:unresolved", stores.clone());

        controller.mount(view.endpoints());
        let screen = render(&controller, &view).await;

        assert_eq!(screen.data["tabs"][0]["text"], "All Unresolved 1");
        assert_eq!(screen.data["tabs"][0]["selected"], true);
        assert_eq!(screen.data["tabs"][1]["selected"], false);
        assert!(screen.lines[0].starts_with("* All Unresolved 1   "));
        assert!(screen.text().contains("WEB-1"));
        assert_eq!(stores.groups().lock().len(), 1);

        let counts = &mock.requests(COUNTS)[0];
        assert_eq!(counts.query.values("query").len(), SAVED_SEARCHES.len());
    }

    #[tokio::test]
    async fn query_change_refetches_counts() {
        let mock = MockTransport::new();
        mock.add(Method::Get, ISSUES, 200, one_issue());
        mock.add(Method::Get, COUNTS, 200, serde_json::json!({"is:unresolved": 1}));
        let stores = StoreContext::new();
        let controller = AsyncController::new(&Client::new(mock.clone()));
        let mut view = IssueListView::new("acme", "is:unresolved", stores.clone());

        controller.mount(view.endpoints());
        render(&controller, &view).await;
        assert!(!controller.reload_if_changed(view.endpoints()));

        mock.add(
            Method::Get,
            COUNTS,
            200,
            serde_json::json!({"is:unresolved": 2, "is:unresolved level:error": 1}),
        );
        view.query = "is:unresolved level:error".to_string();
        assert!(controller.reload_if_changed(view.endpoints()));
        let screen = render(&controller, &view).await;

        assert_eq!(mock.calls(COUNTS), 2);
        assert_eq!(screen.data["tabs"][0]["text"], "All Unresolved 2");
        assert_eq!(screen.data["tabs"][0]["selected"], false);
        let custom = &screen.data["tabs"][SAVED_SEARCHES.len()];
        assert_eq!(custom["text"], "Custom Search 1");
        assert_eq!(custom["selected"], true);
        assert!(screen.text().contains("* Custom Search 1"));
        let issues = mock.requests(ISSUES);
        assert_eq!(issues[1].query.values("query"), vec!["is:unresolved level:error".to_string()]);
    }

    #[tokio::test]
    async fn failed_counts_are_marked_inline() {
        let mock = MockTransport::new();
        mock.add(Method::Get, ISSUES, 200, one_issue());
        mock.add(Method::Get, COUNTS, 500, serde_json::json!({"detail": "boom"}));
        let controller = AsyncController::new(&Client::new(mock.clone()));
        let view = IssueListView::new("acme", "is:unresolved", StoreContext::new());

        controller.mount(view.endpoints());
        let screen = render(&controller, &view).await;

        assert_eq!(controller.state().phase(), Phase::PartialError);
        assert!(!screen.failed);
        assert!(screen.text().contains("[failed to load issue counts]"));
        assert!(screen.text().contains("WEB-1"));
    }

    #[tokio::test]
    async fn failed_issues_fail_the_view() {
        let mock = MockTransport::new();
        mock.add(Method::Get, ISSUES, 403, serde_json::json!({"detail": "Forbidden"}));
        mock.add(Method::Get, COUNTS, 200, serde_json::json!({}));
        let controller = AsyncController::new(&Client::new(mock.clone()));
        let view = IssueListView::new("acme", "is:unresolved", StoreContext::new());

        controller.mount(view.endpoints());
        let screen = render(&controller, &view).await;

        assert!(screen.failed);
        assert_eq!(screen.text(), "Failed to load issues: Forbidden");
    }

    #[tokio::test]
    async fn next_cursor_is_offered() {
        let mock = MockTransport::new();
        let mut response = ApiResponse::ok(one_issue());
        response.link = Some(
            "<https://x/api/0/organizations/acme/issues/?cursor=0:25:0>; rel=\"next\"; results=\"true\"; cursor=\"0:25:0\""
                .to_string(),
        );
        mock.add_matching(Method::Get, ISSUES, &[], response);
        mock.add(Method::Get, COUNTS, 200, serde_json::json!({}));
        let controller = AsyncController::new(&Client::new(mock.clone()));
        let view = IssueListView::new("acme", "is:unresolved", StoreContext::new());

        controller.mount(view.endpoints());
        let screen = render(&controller, &view).await;

        assert!(screen.text().contains("Next page: --cursor 0:25:0"));
        assert_eq!(screen.data["next"], "0:25:0");
    }
}
