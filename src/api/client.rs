//! API client wrapper
//!
//! A [`Client`] is a tracking scope over a shared [`Transport`]: every request
//! it issues is registered until it settles, and [`Client::clear`] cancels all
//! of them at once. Views fork their own client so tearing one down never
//! cancels another view's requests.
//!
//! Two calling conventions are offered:
//! - [`Client::request`]: callbacks, fire-and-forget, returns a cancellable
//!   [`RequestHandle`]. Callbacks never run after cancellation.
//! - [`Client::request_promise`] / [`Client::request_with_response`]: async,
//!   resolving to the decoded body or a [`RequestError`]. A cancelled request
//!   resolves to [`RequestError::Cancelled`].
//!
//! There is no caching and no automatic retry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::error::RequestError;
use super::query::Query;
use super::transport::{ApiRequest, ApiResponse, Method, Transport};

/// Per-request options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub data: Option<serde_json::Value>,
    pub query: Query,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(data: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn put(data: serde_json::Value) -> Self {
        Self {
            method: Method::Put,
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self {
            method: Method::Delete,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
}

type SuccessFn = Box<dyn FnOnce(ApiResponse) + Send>;
type ErrorFn = Box<dyn FnOnce(RequestError) + Send>;
type CompleteFn = Box<dyn FnOnce() + Send>;

/// Callbacks for [`Client::request`]
#[derive(Default)]
pub struct Callbacks {
    success: Option<SuccessFn>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(ApiResponse) + Send + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(RequestError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Runs after `success` or `error`, unless the request was cancelled
    pub fn on_complete(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }
}

/// Handle to a callback-style request
#[derive(Debug, Clone)]
pub struct RequestHandle {
    token: CancellationToken,
}

impl RequestHandle {
    /// Cancels the request; its callbacks will not run
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Removes a request from its scope when dropped, even if its future is
/// abandoned before settling
struct TrackGuard<'a> {
    client: &'a Client,
    id: u64,
}

impl Drop for TrackGuard<'_> {
    fn drop(&mut self) {
        self.client.untrack(self.id);
    }
}

#[derive(Default)]
struct Tracked {
    next: u64,
    active: HashMap<u64, CancellationToken>,
}

/// API client; clones share one tracking scope
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    tracked: Arc<Mutex<Tracked>>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            tracked: Arc::new(Mutex::new(Tracked::default())),
        }
    }

    /// Returns a client with its own tracking scope over the same transport
    pub fn fork(&self) -> Self {
        Self::new(Arc::clone(&self.transport))
    }

    /// Number of requests issued by this scope that have not settled
    pub fn active_requests(&self) -> usize {
        self.tracked.lock().active.len()
    }

    /// Cancels every request tracked by this scope
    pub fn clear(&self) {
        let tokens: Vec<CancellationToken> = {
            let mut tracked = self.tracked.lock();
            tracked.active.drain().map(|(_, t)| t).collect()
        };
        if !tokens.is_empty() {
            tracing::debug!(cancelled = tokens.len(), "api.clear");
        }
        for token in tokens {
            token.cancel();
        }
    }

    fn track(&self) -> (u64, CancellationToken) {
        let mut tracked = self.tracked.lock();
        tracked.next += 1;
        let id = tracked.next;
        let token = CancellationToken::new();
        tracked.active.insert(id, token.clone());
        (id, token)
    }

    fn untrack(&self, id: u64) {
        self.tracked.lock().active.remove(&id);
    }

    async fn dispatch(
        &self,
        id: u64,
        token: CancellationToken,
        request: ApiRequest,
    ) -> Result<ApiResponse, RequestError> {
        tracing::debug!(method = request.method.as_str(), path = %request.path, "api.request");

        let cancelled = || RequestError::Cancelled {
            path: request.path.clone(),
        };

        let guard = TrackGuard { client: self, id };
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(cancelled()),
            result = self.transport.send(&request) => result,
        };
        drop(guard);

        if token.is_cancelled() {
            return Err(cancelled());
        }

        let response = result?;
        tracing::debug!(path = %request.path, status = response.status, "api.response");

        if !response.is_success() {
            return Err(RequestError::from_status(
                request.path.clone(),
                response.status,
                response.body,
            ));
        }
        Ok(response)
    }

    fn build(path: &str, options: RequestOptions) -> ApiRequest {
        ApiRequest {
            method: options.method,
            path: path.to_string(),
            query: options.query,
            body: options.data,
        }
    }

    /// Sends a request and returns the raw response, including the `Link` header
    pub async fn request_with_response(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, RequestError> {
        let (id, token) = self.track();
        self.dispatch(id, token, Self::build(path, options)).await
    }

    /// Sends a request and decodes the body
    pub async fn request_promise<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let response = self.request_with_response(path, options).await?;
        serde_json::from_value(response.body).map_err(|e| RequestError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Sends a request in the background and reports through callbacks
    ///
    /// Must be called from within a tokio runtime.
    pub fn request(&self, path: &str, options: RequestOptions, callbacks: Callbacks) -> RequestHandle {
        let (id, token) = self.track();
        let request = Self::build(path, options);
        let client = self.clone();
        let task_token = token.clone();

        tokio::spawn(async move {
            let result = client.dispatch(id, task_token.clone(), request).await;
            if task_token.is_cancelled() {
                return;
            }

            match result {
                Ok(response) => {
                    if let Some(success) = callbacks.success {
                        success(response);
                    }
                }
                Err(err) if err.is_cancelled() => return,
                Err(err) => {
                    if let Some(error) = callbacks.error {
                        error(err);
                    }
                }
            }

            if let Some(complete) = callbacks.complete {
                complete();
            }
        });

        RequestHandle { token }
    }
}
