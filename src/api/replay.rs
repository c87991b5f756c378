//! Offline transport that replays canned responses from a fixture file
//!
//! Fixture format (JSON):
//! ```json
//! {
//!   "routes": [
//!     {
//!       "method": "GET",
//!       "path": "/organizations/acme/issues/",
//!       "query": {"query": "is:unresolved"},
//!       "status": 200,
//!       "body": [],
//!       "link": "<...>; rel=\"next\"; results=\"false\"; cursor=\"0:25:0\""
//!     }
//!   ]
//! }
//! ```
//!
//! The first route whose method, path and query constraints all match wins.
//! Unmatched requests get a 404 with a `detail` naming the request.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::error::RequestError;
use super::transport::{ApiRequest, ApiResponse, Method, Transport};

fn default_status() -> u16 {
    200
}

/// One canned response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub method: Method,

    pub path: String,

    /// Parameters the request must carry; array parameters match if any
    /// written value (or the comma-joined form) equals the expected value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,

    #[serde(default = "default_status")]
    pub status: u16,

    #[serde(default)]
    pub body: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Contents of a fixture file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixtures {
    pub routes: Vec<Route>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{}/", trimmed)
}

impl Route {
    fn matches(&self, request: &ApiRequest) -> bool {
        if self.method != request.method || normalize(&self.path) != normalize(&request.path) {
            return false;
        }

        self.query.iter().all(|(key, expected)| {
            let values = request.query.values(key);
            values.iter().any(|v| v == expected) || values.join(",") == *expected
        })
    }
}

/// Serves responses from [`Fixtures`]
pub struct ReplayTransport {
    routes: Vec<Route>,
    hits: Mutex<HashMap<String, usize>>,
}

impl ReplayTransport {
    pub fn new(fixtures: Fixtures) -> Self {
        Self {
            routes: fixtures.routes,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Loads fixtures from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixtures: {}", path.display()))?;
        let fixtures: Fixtures = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixtures: {}", path.display()))?;
        Ok(Self::new(fixtures))
    }

    /// Number of requests served for a path, matched or not
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().get(&normalize(path)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RequestError> {
        *self.hits.lock().entry(normalize(&request.path)).or_insert(0) += 1;

        match self.routes.iter().find(|r| r.matches(request)) {
            Some(route) => {
                tracing::debug!(method = route.method.as_str(), path = %route.path, status = route.status, "replay.hit");
                Ok(ApiResponse {
                    status: route.status,
                    body: route.body.clone(),
                    link: route.link.clone(),
                })
            }
            None => {
                let described = if request.query.is_empty() {
                    request.path.clone()
                } else {
                    format!("{}?{}", request.path, request.query.encode())
                };
                tracing::debug!(method = request.method.as_str(), path = %described, "replay.miss");
                Ok(ApiResponse::with_status(
                    404,
                    serde_json::json!({
                        "detail": format!("No fixture for {} {}", request.method.as_str(), described)
                    }),
                ))
            }
        }
    }
}
