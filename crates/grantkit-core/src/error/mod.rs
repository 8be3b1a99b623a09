//! Error types for Grantkit
//!
//! Errors only exist at the edges of the crate: loading configuration,
//! parsing permission kinds from strings, and talking to a platform
//! authorization primitive. Nothing in this module ever crosses the
//! [`PermissionHandler`](crate::permission::PermissionHandler) boundary;
//! handlers degrade failures to an [`AuthorizationStatus`](crate::permission::AuthorizationStatus).

mod constructors;
mod conversions;
mod types;

pub use types::{GrantError, GrantResult};
