//! Permission handler trait and resolution sink

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use super::kind::PermissionKind;
use super::status::AuthorizationStatus;

/// Handler for one permission kind.
///
/// Implement this trait once per platform authorization primitive, or wrap
/// the primitive in [`PlatformHandler`](super::PlatformHandler) which
/// implements the caching and degradation rules for you.
///
/// Implementations must never panic across this boundary. A platform that
/// cannot answer reports `Denied` (or stays `NotDetermined`), never an error.
pub trait PermissionHandler: Send + Sync {
    /// The kind this handler serves
    fn kind(&self) -> PermissionKind;

    /// Last known status; cheap and side-effect free
    fn status(&self) -> AuthorizationStatus;

    /// Observe status changes.
    ///
    /// Every change to the value returned by [`status`](Self::status) must be
    /// published here, whoever triggered the request. Coordinators use it to
    /// settle batches that share this handler.
    fn subscribe(&self) -> watch::Receiver<AuthorizationStatus>;

    /// Trigger the platform prompt if the status is `NotDetermined`.
    ///
    /// Every call must eventually produce one `sink.resolve(..)`. When the
    /// status is already terminal the sink is resolved immediately with it.
    fn request_access(&self, sink: ResolutionSink);
}

/// Shared permission handler type
pub type SharedPermissionHandler = Arc<dyn PermissionHandler>;

type Deliver = dyn Fn(PermissionKind, AuthorizationStatus) + Send + Sync;

/// Where a handler reports the outcome of a `request_access` call.
///
/// Cloneable and callable from any thread. The coordinator binds sinks to a
/// session's event channel so platform callbacks are marshalled onto the
/// session driver before any shared state is touched.
#[derive(Clone)]
pub struct ResolutionSink {
    kind: PermissionKind,
    deliver: Arc<Deliver>,
}

impl ResolutionSink {
    /// Create a sink that forwards resolutions to `deliver`
    pub fn new<F>(kind: PermissionKind, deliver: F) -> Self
    where
        F: Fn(PermissionKind, AuthorizationStatus) + Send + Sync + 'static,
    {
        Self {
            kind,
            deliver: Arc::new(deliver),
        }
    }

    /// A sink that drops every resolution
    pub fn detached(kind: PermissionKind) -> Self {
        Self::new(kind, |_, _| {})
    }

    pub fn kind(&self) -> PermissionKind {
        self.kind
    }

    /// Report the status the handler resolved to
    pub fn resolve(&self, status: AuthorizationStatus) {
        (self.deliver)(self.kind, status);
    }
}

impl fmt::Debug for ResolutionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionSink")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
