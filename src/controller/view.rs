//! Render hooks for views driven by an [`AsyncController`](super::AsyncController)

use super::endpoint::EndpointSpec;
use super::state::{FetchState, Phase};

/// A view that declares its endpoints and renders from their results
pub trait AsyncView {
    type Output;

    /// Requests this view needs for its current inputs
    fn endpoints(&self) -> Vec<EndpointSpec>;

    fn render_loading(&self) -> Self::Output;

    /// Whole-view failure
    fn render_error(&self, state: &FetchState) -> Self::Output;

    /// Normal rendering; failed non-critical sections are marked inline
    fn render_body(&self, state: &FetchState) -> Self::Output;

    fn render(&self, state: &FetchState) -> Self::Output {
        match state.phase() {
            Phase::Init | Phase::Loading => self.render_loading(),
            Phase::Error => self.render_error(state),
            Phase::Success | Phase::PartialError => self.render_body(state),
        }
    }
}
