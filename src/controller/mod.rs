//! # Async Component Controller
//!
//! Drives a view's data fetching: issues every endpoint in parallel, merges
//! each result into [`FetchState`] as it settles and tells subscribers when
//! something changed.
//!
//! ## Lifecycle
//!
//! ```text
//! Init -> Loading -> Success | PartialError | Error
//!            ^                     |
//!            +---- reload ---------+
//! ```
//!
//! Every mount or reload starts a new generation. A result from an older
//! generation is discarded, so a slow response can never overwrite a newer
//! one. Unmounting (or dropping) the controller cancels everything in flight;
//! late results are dropped without touching state or notifying anyone.

mod endpoint;
mod state;
mod view;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::Client;

pub use endpoint::{endpoints_changed, EndpointSpec};
pub use state::{FetchState, Phase};
pub use view::AsyncView;

struct Inner {
    state: FetchState,
    endpoints: Vec<EndpointSpec>,
    generation: u64,
    token: CancellationToken,
    mounted: bool,
}

/// Fetch coordinator for one view
pub struct AsyncController {
    client: Client,
    inner: Arc<Mutex<Inner>>,
    changes: Arc<watch::Sender<u64>>,
}

impl AsyncController {
    /// Creates a controller with its own request scope forked from `client`
    pub fn new(client: &Client) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            client: client.fork(),
            inner: Arc::new(Mutex::new(Inner {
                state: FetchState::default(),
                endpoints: Vec::new(),
                generation: 0,
                token: CancellationToken::new(),
                mounted: false,
            })),
            changes: Arc::new(changes),
        }
    }

    /// Starts fetching `endpoints`
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(&self, endpoints: Vec<EndpointSpec>) {
        self.start(endpoints);
    }

    /// Refetches only if `endpoints` differ from the current ones
    ///
    /// Returns true if a fetch was started.
    pub fn reload_if_changed(&self, endpoints: Vec<EndpointSpec>) -> bool {
        {
            let inner = self.inner.lock();
            if inner.mounted && !endpoints_changed(&inner.endpoints, &endpoints) {
                return false;
            }
        }
        self.start(endpoints);
        true
    }

    /// Refetches the current endpoints unconditionally
    pub fn reload(&self) {
        let endpoints = self.inner.lock().endpoints.clone();
        self.start(endpoints);
    }

    /// Cancels everything in flight; later results are discarded
    pub fn unmount(&self) {
        let mut inner = self.inner.lock();
        if !inner.mounted {
            return;
        }
        inner.mounted = false;
        inner.token.cancel();
        drop(inner);

        self.client.clear();
        tracing::debug!("controller.unmount");
    }

    /// Waits until every request of the current generation has settled
    pub async fn settled(&self) {
        let mut rx = self.changes.subscribe();
        loop {
            {
                let inner = self.inner.lock();
                if !inner.mounted || !inner.state.loading {
                    return;
                }
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Change notifications; the value is a version counter
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Snapshot of the current fetch state
    pub fn state(&self) -> FetchState {
        self.inner.lock().state.clone()
    }

    pub fn endpoints(&self) -> Vec<EndpointSpec> {
        self.inner.lock().endpoints.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lock().mounted
    }

    /// Renders `view` from the current state
    pub fn render<V: AsyncView>(&self, view: &V) -> V::Output {
        let state = self.state();
        view.render(&state)
    }

    fn start(&self, endpoints: Vec<EndpointSpec>) {
        let (generation, token) = {
            let mut inner = self.inner.lock();
            inner.token.cancel();
            inner.generation += 1;
            inner.token = CancellationToken::new();
            inner.mounted = true;
            let generation = inner.generation;
            inner.state.begin(generation, &endpoints);
            inner.endpoints = endpoints.clone();
            (generation, inner.token.clone())
        };

        tracing::debug!(generation, endpoints = endpoints.len(), "controller.fetch");
        self.notify();

        for endpoint in endpoints {
            let client = self.client.clone();
            let inner = Arc::clone(&self.inner);
            let changes = Arc::clone(&self.changes);
            let token = token.clone();

            tokio::spawn(async move {
                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    result = client.request_with_response(&endpoint.path, endpoint.options.clone()) => result,
                };

                let mut guard = inner.lock();
                if !guard.mounted || guard.generation != generation {
                    tracing::trace!(key = %endpoint.key, generation, "controller.stale");
                    return;
                }
                guard.state.settle(&endpoint.key, result);
                drop(guard);

                changes.send_modify(|version| *version += 1);
            });
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

impl Drop for AsyncController {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::{ApiResponse, Method, Query};

    struct Dashboard;

    impl AsyncView for Dashboard {
        type Output = String;

        fn endpoints(&self) -> Vec<EndpointSpec> {
            vec![
                EndpointSpec::new("a", "/a/"),
                EndpointSpec::new("b", "/b/"),
                EndpointSpec::new("c", "/c/"),
            ]
        }

        fn render_loading(&self) -> String {
            "loading".to_string()
        }

        fn render_error(&self, _state: &FetchState) -> String {
            "error".to_string()
        }

        fn render_body(&self, state: &FetchState) -> String {
            state
                .keys()
                .iter()
                .map(|k| match (state.data(k), state.error(k)) {
                    (Some(v), _) => format!("{}={}", k, v),
                    (None, Some(_)) => format!("{}=[failed]", k),
                    (None, None) => format!("{}=-", k),
                })
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    #[tokio::test]
    async fn partial_failure_renders_body_with_marker() {
        let mock = MockTransport::new();
        mock.add(Method::Get, "/a/", 200, serde_json::json!(1));
        mock.add(Method::Get, "/b/", 200, serde_json::json!(2));
        mock.add(Method::Get, "/c/", 500, serde_json::json!({"detail": "boom"}));
        let controller = AsyncController::new(&Client::new(mock.clone()));

        assert_eq!(controller.render(&Dashboard), "loading");
        controller.mount(Dashboard.endpoints());
        assert_eq!(controller.render(&Dashboard), "loading");

        controller.settled().await;

        assert_eq!(controller.state().phase(), Phase::PartialError);
        assert_eq!(controller.render(&Dashboard), "a=1 b=2 c=[failed]");
    }

    #[tokio::test]
    async fn critical_failure_renders_error() {
        let mock = MockTransport::new();
        mock.add(Method::Get, "/a/", 404, serde_json::Value::Null);
        mock.add(Method::Get, "/b/", 200, serde_json::json!(2));
        let controller = AsyncController::new(&Client::new(mock.clone()));

        controller.mount(vec![
            EndpointSpec::new("a", "/a/").critical(),
            EndpointSpec::new("b", "/b/"),
        ]);
        controller.settled().await;

        assert_eq!(controller.render(&Dashboard), "error");
    }

    #[tokio::test]
    async fn unmount_discards_late_results() {
        let mock = MockTransport::new();
        let reply = mock.defer(Method::Get, "/a/");
        let controller = AsyncController::new(&Client::new(mock.clone()));

        controller.mount(vec![EndpointSpec::new("a", "/a/")]);
        mock.wait_for_calls("/a/", 1).await;

        let mut rx = controller.subscribe();
        let before = controller.state();
        controller.unmount();

        let _ = reply.send(ApiResponse::ok(serde_json::json!("late")));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(!controller.is_mounted());
        assert!(!rx.has_changed().unwrap());
        assert!(controller.state().data("a").is_none());
        assert_eq!(controller.state().generation, before.generation);
        controller.settled().await;
    }

    #[tokio::test]
    async fn drop_cancels_requests() {
        let mock = MockTransport::new();
        let reply = mock.defer(Method::Get, "/a/");
        let client = Client::new(mock.clone());
        let controller = AsyncController::new(&client);

        controller.mount(vec![EndpointSpec::new("a", "/a/")]);
        mock.wait_for_calls("/a/", 1).await;
        let mut rx = controller.subscribe();
        drop(controller);

        let _ = reply.send(ApiResponse::ok(serde_json::json!("late")));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test]
    async fn newer_generation_wins() {
        let mock = MockTransport::new();
        let first = mock.defer(Method::Get, "/a/");
        let second = mock.defer(Method::Get, "/a/");
        let controller = AsyncController::new(&Client::new(mock.clone()));

        controller.mount(vec![EndpointSpec::new("a", "/a/")]);
        mock.wait_for_calls("/a/", 1).await;
        controller.reload();
        mock.wait_for_calls("/a/", 2).await;

        second.send(ApiResponse::ok(serde_json::json!("new"))).unwrap();
        let _ = first.send(ApiResponse::ok(serde_json::json!("old")));
        controller.settled().await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(controller.state().data("a"), Some(&serde_json::json!("new")));
        assert_eq!(controller.state().generation, 2);
    }

    #[tokio::test]
    async fn reload_if_changed_diffs_by_key() {
        let mock = MockTransport::new();
        mock.add(Method::Get, "/a/", 200, serde_json::json!(1));
        mock.add(Method::Get, "/b/", 200, serde_json::json!(2));
        let controller = AsyncController::new(&Client::new(mock.clone()));

        let a = EndpointSpec::new("a", "/a/");
        let b = EndpointSpec::new("b", "/b/");
        assert!(controller.reload_if_changed(vec![a.clone(), b.clone()]));
        controller.settled().await;

        assert!(!controller.reload_if_changed(vec![b.clone(), a.clone()]));
        assert_eq!(mock.calls("/a/"), 1);

        let a2 = a.clone().with_query(Query::new().with("cursor", "0:25:0"));
        assert!(controller.reload_if_changed(vec![a2]));
        let state = controller.state();
        assert!(state.loading);
        assert_eq!(state.data("a"), Some(&serde_json::json!(1)));
        assert!(state.data("b").is_none());

        controller.settled().await;
        assert_eq!(mock.calls("/a/"), 2);
        assert_eq!(controller.state().phase(), Phase::Success);
    }

    #[tokio::test]
    async fn subscribers_see_each_settle() {
        let mock = MockTransport::new();
        mock.add(Method::Get, "/a/", 200, serde_json::json!(1));
        let controller = AsyncController::new(&Client::new(mock.clone()));
        let mut rx = controller.subscribe();

        controller.mount(vec![EndpointSpec::new("a", "/a/")]);
        controller.settled().await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 2);
    }
}
