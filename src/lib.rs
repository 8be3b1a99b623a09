//! Grantkit
//!
//! Ask for a group of platform permissions at once and get told exactly once
//! when the user has answered all of them.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use grantkit::{BatchCoordinator, HandlerRegistry, PermissionKind};
//!
//! # async fn run(registry: HandlerRegistry) {
//! let coordinator = BatchCoordinator::new(Arc::new(registry));
//! let session = coordinator.begin_batch(
//!     vec![PermissionKind::Camera.into(), PermissionKind::Photos.into()],
//!     || tracing::info!("onboarding permissions answered"),
//! );
//! session.request_all();
//! let outcome = session.wait_settled().await;
//! println!("granted: {:?}", outcome.granted);
//! # }
//! ```

pub use grantkit_core::config::ConfigSource;
pub use grantkit_core::*;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG` overrides the configured level when set. Returns false if a
/// global subscriber was already installed, in which case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    };

    result.is_ok()
}

/// Load configuration from defaults, an optional file and `GRANTKIT_*`
/// environment variables, in that order
pub fn load_config(path: Option<&std::path::Path>) -> GrantResult<GrantConfig> {
    let mut loader = ConfigLoader::new().with_defaults();
    if let Some(path) = path {
        loader = loader.with_file(path);
    }
    loader.with_env().load()
}
