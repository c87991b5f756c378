//! # Stores
//!
//! In-memory state shared by actions and views. Each store owns one slice
//! of state, mutates it synchronously, and publishes on its [`Topic`].
//!
//! - [`GroupStore`]: issue groups with optimistic writes and rollback
//! - [`GuideStore`]: onboarding guide eligibility and progress
//! - [`ConfigStore`]: signed-in user and active organization
//!
//! [`PendingLedger`] is the reconciliation core behind optimistic writes.

mod config_store;
mod context;
mod group_store;
mod guide_store;
mod ledger;
mod topics;

pub use config_store::{ConfigStore, GUIDES_FEATURE};
pub use context::StoreContext;
pub use group_store::GroupStore;
pub use guide_store::{AnalyticsEvent, GuideState, GuideStore, FORCE_SHOW_FRAGMENT};
pub use ledger::{EntityState, PendingLedger, Reconcile};
pub use topics::{StoreEvent, Topic, Topics};
