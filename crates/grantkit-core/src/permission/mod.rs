//! Permission vocabulary and the handler contract
//!
//! This module provides:
//! - [`AuthorizationStatus`], the status set shared by every permission kind
//! - [`PermissionKind`], the registry key naming a protected resource
//! - [`PermissionRequestItem`], one entry of a batch request
//! - [`PermissionHandler`], the per-kind capability contract
//! - [`PlatformHandler`], one generic handler over a platform primitive

mod handler;
mod item;
mod kind;
mod platform;
mod status;

pub use handler::{PermissionHandler, ResolutionSink, SharedPermissionHandler};
pub use item::PermissionRequestItem;
pub use kind::PermissionKind;
#[cfg(test)]
pub use platform::MockPlatformAuthorization;
pub use platform::{PlatformAuthorization, PlatformHandler, PromptCompletion};
pub use status::AuthorizationStatus;
