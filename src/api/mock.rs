//! In-memory transport for unit tests
//!
//! Routes answer either with a fixed response or, for [`MockTransport::defer`],
//! with whatever the test sends through the returned channel. Deferred
//! replies let tests settle requests in any order.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::error::RequestError;
use super::transport::{ApiRequest, ApiResponse, Method, Transport};

enum Reply {
    Ready(ApiResponse),
    Deferred(oneshot::Receiver<ApiResponse>),
}

struct MockRoute {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    queued: VecDeque<oneshot::Receiver<ApiResponse>>,
    fixed: Option<ApiResponse>,
}

impl MockRoute {
    fn matches(&self, request: &ApiRequest) -> bool {
        if self.method != request.method || self.path != request.path {
            return false;
        }
        let pairs = request.query.pairs();
        self.query.iter().all(|q| pairs.contains(q))
    }
}

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<MockRoute>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers every matching request with a fixed response
    pub fn add(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.add_matching(method, path, &[], ApiResponse::with_status(status, body));
    }

    /// Like [`add`](Self::add), restricted to requests carrying `query` pairs
    pub fn add_matching(&self, method: Method, path: &str, query: &[(&str, &str)], response: ApiResponse) {
        self.routes.lock().push(MockRoute {
            method,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            queued: VecDeque::new(),
            fixed: Some(response),
        });
    }

    /// Holds the next matching request until the test sends its response
    pub fn defer(&self, method: Method, path: &str) -> oneshot::Sender<ApiResponse> {
        let (tx, rx) = oneshot::channel();
        let mut routes = self.routes.lock();
        let existing = routes
            .iter_mut()
            .rev()
            .find(|r| r.method == method && r.path == path && r.query.is_empty());
        match existing {
            Some(route) => route.queued.push_back(rx),
            None => routes.push(MockRoute {
                method,
                path: path.to_string(),
                query: Vec::new(),
                queued: VecDeque::from([rx]),
                fixed: None,
            }),
        }
        tx
    }

    /// Number of requests made to `path`
    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|r| r.path == path).count()
    }

    /// Requests made to `path`, oldest first
    pub fn requests(&self, path: &str) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Yields until `path` has been requested at least `count` times
    pub async fn wait_for_calls(&self, path: &str, count: usize) {
        for _ in 0..1000 {
            if self.calls(path) >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("{} was requested {} times, expected {}", path, self.calls(path), count);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RequestError> {
        self.calls.lock().push(request.clone());

        let reply = {
            let mut routes = self.routes.lock();
            routes
                .iter_mut()
                .rev()
                .find(|r| r.matches(request))
                .and_then(|route| match route.queued.pop_front() {
                    Some(rx) => Some(Reply::Deferred(rx)),
                    None => route.fixed.clone().map(Reply::Ready),
                })
        };

        match reply {
            Some(Reply::Ready(response)) => Ok(response),
            Some(Reply::Deferred(rx)) => rx.await.map_err(|_| RequestError::Network {
                path: request.path.clone(),
                message: "mock reply dropped".to_string(),
            }),
            None => Ok(ApiResponse::with_status(
                404,
                serde_json::json!({"detail": format!("no mock for {}", request.path)}),
            )),
        }
    }
}
