//! Configuration for Grantkit

mod coordinator_config;
mod loader;
mod logging_config;
mod model;

pub use coordinator_config::CoordinatorConfig;
pub use loader::{ConfigLoader, ConfigSource};
pub use logging_config::LoggingConfig;
pub use model::GrantConfig;
