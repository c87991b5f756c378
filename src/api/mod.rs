//! # API Client Layer
//!
//! Everything that talks to the REST API goes through this module.
//!
//! ## Pieces
//!
//! | Type | Role |
//! |------|------|
//! | [`Client`] | Tracking scope: issues requests, cancels them with `clear()` |
//! | [`Transport`] | Carries a request to the server |
//! | [`HttpTransport`] | reqwest over HTTPS, bearer token auth |
//! | [`ReplayTransport`] | Canned responses from a fixture file |
//! | [`Query`] | Ordered query parameters with array styles |
//! | [`PageLinks`] | Parsed `Link` header cursors |
//! | [`RequestError`] | Structured failure with HTTP status |
//!
//! ## Paths
//!
//! Paths are relative to `/api/0/` and always end with a slash, e.g.
//! `/organizations/{org}/issues/` or `/projects/{org}/{project}/rules/`.

mod client;
mod error;
mod links;
mod query;
mod replay;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{Callbacks, Client, RequestHandle, RequestOptions};
pub use error::RequestError;
pub use links::{LinkError, PageLink, PageLinks};
pub use query::{ArrayStyle, Query, QueryValue};
pub use replay::{Fixtures, ReplayTransport, Route};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
