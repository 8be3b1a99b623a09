//! Generic handler over a platform authorization primitive
//!
//! Each permission kind differs only in how it reads native status and how
//! it shows the system prompt. [`PlatformAuthorization`] captures exactly
//! that, and [`PlatformHandler`] implements the rest of the
//! [`PermissionHandler`] contract once for all kinds.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use super::handler::{PermissionHandler, ResolutionSink};
use super::kind::PermissionKind;
use super::status::AuthorizationStatus;
use crate::error::GrantResult;

/// Completion for a platform prompt; may be invoked from any thread
pub type PromptCompletion = Box<dyn FnOnce(GrantResult<AuthorizationStatus>) + Send + 'static>;

/// One platform authorization primitive (camera, contacts, ...).
///
/// Adapters translate the native status codes into [`AuthorizationStatus`]
/// and nothing else.
#[cfg_attr(test, mockall::automock)]
pub trait PlatformAuthorization: Send + Sync + 'static {
    /// Read the native status without prompting
    fn current_status(&self) -> GrantResult<AuthorizationStatus>;

    /// Show the system prompt and call `completion` with the answer
    fn prompt(&self, completion: PromptCompletion);
}

/// [`PermissionHandler`] built from a [`PlatformAuthorization`].
///
/// The cached status is refreshed from the platform at construction and
/// after every prompt, and published to subscribers on change. Platform
/// failures degrade to `Denied`.
pub struct PlatformHandler<P: PlatformAuthorization> {
    kind: PermissionKind,
    platform: Arc<P>,
    status: Arc<watch::Sender<AuthorizationStatus>>,
}

impl<P: PlatformAuthorization> PlatformHandler<P> {
    pub fn new(kind: PermissionKind, platform: P) -> Self {
        let platform = Arc::new(platform);
        let status = read_platform(kind, platform.as_ref());
        tracing::debug!(%kind, %status, "platform handler created");

        let (status, _) = watch::channel(status);
        Self {
            kind,
            platform,
            status: Arc::new(status),
        }
    }

    /// Re-read the platform, e.g. after the user visited system settings
    pub fn refresh(&self) -> AuthorizationStatus {
        let status = read_platform(self.kind, self.platform.as_ref());
        self.status.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
        status
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }
}

impl<P: PlatformAuthorization> PermissionHandler for PlatformHandler<P> {
    fn kind(&self) -> PermissionKind {
        self.kind
    }

    fn status(&self) -> AuthorizationStatus {
        *self.status.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<AuthorizationStatus> {
        self.status.subscribe()
    }

    fn request_access(&self, sink: ResolutionSink) {
        let current = self.status();
        if current.is_terminal() {
            tracing::debug!(kind = %self.kind, status = %current, "already resolved, skipping prompt");
            sink.resolve(current);
            return;
        }

        let kind = self.kind;
        let platform = Arc::clone(&self.platform);
        let cached = Arc::clone(&self.status);

        tracing::debug!(%kind, "prompting platform");
        self.platform.prompt(Box::new(move |answer| {
            let answered = match answer {
                Ok(status) => normalize(kind, status),
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "platform prompt failed, treating as denied");
                    AuthorizationStatus::Denied
                }
            };

            // The platform is the source of truth once it has committed an answer.
            let status = match platform.current_status() {
                Ok(read) if read.is_terminal() => normalize(kind, read),
                _ => answered,
            };

            cached.send_if_modified(|current| {
                if *current == status || (current.is_terminal() && !status.is_terminal()) {
                    return false;
                }
                *current = status;
                true
            });
            sink.resolve(status);
        }));
    }
}

impl<P: PlatformAuthorization> fmt::Debug for PlatformHandler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformHandler")
            .field("kind", &self.kind)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

fn read_platform<P: PlatformAuthorization + ?Sized>(
    kind: PermissionKind,
    platform: &P,
) -> AuthorizationStatus {
    match platform.current_status() {
        Ok(status) => normalize(kind, status),
        Err(e) => {
            tracing::warn!(%kind, error = %e, "platform status unavailable, treating as denied");
            AuthorizationStatus::Denied
        }
    }
}

/// Kinds without partial grants never report `Limited`.
pub(crate) fn normalize(kind: PermissionKind, status: AuthorizationStatus) -> AuthorizationStatus {
    if status == AuthorizationStatus::Limited && !kind.supports_limited() {
        AuthorizationStatus::Granted
    } else {
        status
    }
}
