//! Domain models for lookout
//!
//! Contains the record types and pure rules without any I/O concerns.

mod id;
mod group;
mod org;
pub mod guide;

pub use id::{unique_id, ActorKind, ActorRef, GroupId, IdError, RequestId};
pub use group::{
    Activity, ActivityType, Actor, Group, GroupPatch, GroupStatus, MergeResult, ProjectRef,
};
pub use guide::{AssistantEntry, Guide, GuideOutcome, GuideStep};
pub use org::{Organization, User};
