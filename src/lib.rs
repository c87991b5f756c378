//! Lookout CLI - a terminal client for error-monitoring issue streams
//!
//! Lookout talks to an error-monitoring server's REST API. Issues (groups of
//! similar error events) are loaded into client-side stores; triage writes are
//! applied optimistically and rolled back if the server refuses them. Views
//! fetch several endpoints in parallel and render partial results when some of
//! them fail. An onboarding guide engine picks which guide to show for the
//! anchors present on screen.

pub mod actions;
pub mod api;
pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
pub mod store;

pub use api::{Client, RequestError};
pub use domain::{Group, GroupId, GroupPatch, GroupStatus, Guide};
pub use store::StoreContext;
