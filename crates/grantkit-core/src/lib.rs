//! Grantkit Core Library
//!
//! This crate provides the permission registry and the multi-request
//! completion coordinator: it maps permission kinds to handlers, drives a
//! batch of handlers concurrently, and fires one callback when every item of
//! the batch has reached a terminal status.

#![allow(clippy::collapsible_if)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod permission;
pub mod registry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::{ConfigLoader, CoordinatorConfig, GrantConfig, LoggingConfig};
pub use coordinator::{BatchCoordinator, BatchOutcome, BatchPhase, BatchSession, DebouncePolicy};
pub use error::{GrantError, GrantResult};
pub use events::{BatchEvent, BatchId, EventBus};
pub use permission::{
    AuthorizationStatus, PermissionHandler, PermissionKind, PermissionRequestItem,
    PlatformAuthorization, PlatformHandler, PromptCompletion, ResolutionSink,
    SharedPermissionHandler,
};
pub use registry::{HandlerFactory, HandlerRegistry, HandlerRegistryBuilder, RegistryStatistics};
