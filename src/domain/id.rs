//! Typed identifiers for server records and client-side requests
//!
//! ID Format:
//! - Group IDs: the server's numeric issue ID as a string (e.g., `4512`)
//! - Actor references: `user:{id}` or `team:{id}` (a bare number means a user)
//! - Request IDs: process-unique, strictly increasing (`req-{n}`)
//!
//! Request IDs order writes: a larger ID was issued later. Stores compare them
//! to decide whether a network response is still relevant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid issue ID: expected a numeric ID, got '{0}'")]
    InvalidGroupId(String),

    #[error("Invalid actor: expected 'user:{{id}}', 'team:{{id}}' or a numeric user ID, got '{0}'")]
    InvalidActor(String),

    #[error("Invalid request ID: '{0}'")]
    InvalidRequestId(String),
}

/// Identifier of a group (an issue) as assigned by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GroupId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdError::InvalidGroupId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for GroupId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GroupId> for String {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

/// Kind of actor an issue can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    User,
    Team,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::User => "user",
            ActorKind::Team => "team",
        }
    }
}

/// Reference to a user or team, in the `{kind}:{id}` wire form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorRef {
    kind: ActorKind,
    id: String,
}

impl ActorRef {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: ActorKind::User,
            id: id.into(),
        }
    }

    pub fn team(id: impl Into<String>) -> Self {
        Self {
            kind: ActorKind::Team,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for ActorRef {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, id) = match s.split_once(':') {
            Some(("user", id)) => (ActorKind::User, id),
            Some(("team", id)) => (ActorKind::Team, id),
            Some(_) => return Err(IdError::InvalidActor(s.to_string())),
            None => (ActorKind::User, s),
        };

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdError::InvalidActor(s.to_string()));
        }

        Ok(Self {
            kind,
            id: id.to_string(),
        })
    }
}

impl TryFrom<String> for ActorRef {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActorRef> for String {
    fn from(actor: ActorRef) -> Self {
        actor.to_string()
    }
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one client-side write, ordered by issuance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Issues a new request ID, greater than every ID issued before it
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Returns a fresh [`RequestId`]
pub fn unique_id() -> RequestId {
    RequestId::next()
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .strip_prefix("req-")
            .and_then(|n| n.parse::<u64>().ok())
            .map(Self)
            .ok_or_else(|| IdError::InvalidRequestId(s.to_string()))
    }
}
