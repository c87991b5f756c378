//! # Action Creators
//!
//! The only way commands and views change store state. Each write follows
//! the same shape:
//!
//! 1. take a fresh [`RequestId`](crate::domain::RequestId) from `unique_id()`
//! 2. apply the optimistic patch to the store
//! 3. send the request
//! 4. hand the server result (or the error) back to the store with the same
//!    request ID, which commits, rebases or rolls back
//!
//! Input that can never succeed is rejected before anything is sent.

mod config;
mod groups;
mod guides;

use serde::Serialize;
use thiserror::Error;

use crate::api::RequestError;

pub use config::ConfigActions;
pub use groups::GroupActions;
pub use guides::{AlertReminderCondition, GuideActions, GuideCondition};

#[derive(Debug, Error)]
pub enum ActionError {
    /// Rejected before any request was made
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Could not encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ActionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ActionError::Request(e) if e.is_cancelled())
    }
}

/// Encodes a request body
fn encode_body<T: Serialize>(value: &T) -> Result<serde_json::Value, ActionError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn unencodable_body_is_an_error() {
        // JSON object keys must be strings
        let body: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
        let err = encode_body(&body).unwrap_err();
        assert!(matches!(err, ActionError::Encode(_)));
        assert!(err.to_string().starts_with("Could not encode request body"));
    }

    #[test]
    fn patch_encodes_to_its_fields() {
        let patch = crate::domain::GroupPatch::status(crate::domain::GroupStatus::Resolved);
        assert_eq!(
            encode_body(&patch).unwrap(),
            serde_json::json!({"status": "resolved"})
        );
    }
}
