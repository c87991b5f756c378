//! Transports carry one request to the server and bring back its response
//!
//! The client never looks at the wire itself; it hands an [`ApiRequest`] to a
//! [`Transport`] and interprets the [`ApiResponse`]. Non-2xx answers are
//! responses, not transport errors: the client turns them into
//! [`RequestError::Status`].

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::RequestError;
use super::query::Query;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request as handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,

    /// API path relative to `/api/0/`, e.g. `/organizations/acme/issues/`
    pub path: String,

    pub query: Query,

    pub body: Option<serde_json::Value>,
}

/// A response as returned by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,

    pub body: serde_json::Value,

    /// Raw `Link` header, if any
    pub link: Option<String>,
}

impl ApiResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body,
            link: None,
        }
    }

    pub fn with_status(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body,
            link: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to an API
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RequestError>;
}

/// Transport over HTTPS using reqwest
pub struct HttpTransport {
    http: reqwest::Client,
    api_root: Url,
    token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport for the server at `base_url`
    ///
    /// Paths are resolved against `{base_url}/api/0/`.
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_root = Url::parse(&base)
            .and_then(|url| url.join("api/0/"))
            .with_context(|| format!("Invalid server URL: {}", base_url))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("lookout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Could not set up the HTTP client")?;

        Ok(Self {
            http,
            api_root,
            token,
        })
    }

    /// Resolves an API path and query into a full URL
    pub fn url(&self, path: &str, query: &Query) -> Result<Url, url::ParseError> {
        let mut url = self.api_root.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.pairs());
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RequestError> {
        let network = |message: String| RequestError::Network {
            path: request.path.clone(),
            message,
        };

        let url = self
            .url(&request.path, &request.query)
            .map_err(|e| network(format!("invalid URL: {}", e)))?;

        let mut builder = self.http.request(request.method.into(), url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| network(e.to_string()))?;

        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.map_err(|e| network(e.to_string()))?;

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(_) if !(200..300).contains(&status) => serde_json::Value::String(text),
                Err(e) => {
                    return Err(RequestError::Decode {
                        path: request.path.clone(),
                        message: e.to_string(),
                    })
                }
            }
        };

        Ok(ApiResponse { status, body, link })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_paths_under_api_root() {
        let transport = HttpTransport::new("https://monitor.example.com", None).unwrap();
        let url = transport
            .url(
                "/organizations/acme/issues/",
                &Query::new().with("query", "is:unresolved"),
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://monitor.example.com/api/0/organizations/acme/issues/?query=is%3Aunresolved"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let transport = HttpTransport::new("https://example.com/monitor/", None).unwrap();
        let url = transport.url("/assistant/", &Query::new()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/monitor/api/0/assistant/");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(HttpTransport::new("not a url", None).is_err());
    }

    #[test]
    fn method_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Method::Delete).unwrap(), "\"DELETE\"");
        let parsed: Method = serde_json::from_str("\"PUT\"").unwrap();
        assert_eq!(parsed, Method::Put);
    }
}
