//! Bundle of host capabilities handed to the core

use crate::{AssertionProbe, PromptPresenter, Sleeper, UpdateSurface, UserInfoProbe, VersionProbe};

/// Every capability one invocation needs.
///
/// Platform crates build one of these with real implementations; tests build
/// one from a [`crate::MockHost`].
pub struct HostCapabilities {
    pub version: Box<dyn VersionProbe>,
    pub assertions: Box<dyn AssertionProbe>,
    pub users: Box<dyn UserInfoProbe>,
    pub presenter: Box<dyn PromptPresenter>,
    pub update_surface: Box<dyn UpdateSurface>,
    pub sleeper: Box<dyn Sleeper>,
}

impl std::fmt::Debug for HostCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCapabilities").finish_non_exhaustive()
    }
}
