//! Batch coordinator
//!
//! Runs a batch of permission requests to completion and fires exactly one
//! settle callback. The batch is complete when a fresh read of every item's
//! handler finds no `NotDetermined` status; `Granted`, `Denied` and
//! `Limited` are equally terminal. Kinds without a handler count as denied.
//!
//! The settle check is a full re-scan after every resolution and every
//! status change of an involved handler, never a countdown. Duplicate or
//! late resolutions cannot corrupt it, and an answer given outside this
//! batch still settles it.

mod debounce;
mod driver;
mod session;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};

pub use debounce::DebouncePolicy;
pub use session::{BatchOutcome, BatchPhase, BatchSession};

use crate::config::CoordinatorConfig;
use crate::events::{BatchEvent, BatchId, EventBus};
use crate::permission::{
    AuthorizationStatus, PermissionKind, PermissionRequestItem, SharedPermissionHandler,
};
use crate::registry::HandlerRegistry;
use driver::StatusWatchers;
use session::{SessionShared, session_sink};

/// Drives batches of permission requests against a shared registry
#[derive(Debug)]
pub struct BatchCoordinator {
    registry: Arc<HandlerRegistry>,
    config: CoordinatorConfig,
    events: EventBus,
    next_id: AtomicU64,
}

impl BatchCoordinator {
    /// Create a coordinator with the default configuration
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_config(registry, CoordinatorConfig::default())
    }

    pub fn with_config(registry: Arc<HandlerRegistry>, config: CoordinatorConfig) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            registry,
            config,
            events,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn debounce(&self) -> DebouncePolicy {
        self.config.debounce()
    }

    /// Subscribe to events of every batch started from now on
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }

    /// Handler for a kind, for the presentation layer to bind actions to
    pub fn handler_for(&self, kind: PermissionKind) -> Option<SharedPermissionHandler> {
        self.registry.get(kind)
    }

    /// Start a batch.
    ///
    /// If no item is `NotDetermined` the batch settles before this returns
    /// and `on_settled` runs on the caller's thread. Otherwise a session
    /// driver is spawned on the current tokio runtime, and `on_settled` runs
    /// there once the batch settles.
    ///
    /// Outside a tokio runtime an undecided batch cannot be driven: the
    /// returned session reports statuses but never settles.
    pub fn begin_batch<F>(&self, items: Vec<PermissionRequestItem>, on_settled: F) -> BatchSession
    where
        F: FnOnce() + Send + 'static,
    {
        let id = BatchId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut kinds: Vec<PermissionKind> = Vec::with_capacity(items.len());
        for item in &items {
            if !kinds.contains(&item.kind()) {
                kinds.push(item.kind());
            }
        }

        self.registry.ensure_registered(kinds.iter().copied());

        let handlers: Vec<_> = kinds
            .iter()
            .map(|kind| (*kind, self.registry.get(*kind)))
            .collect();

        tracing::info!(batch = %id, kinds = ?kinds, "starting permission batch");
        self.events.publish(BatchEvent::Started {
            batch: id,
            kinds: kinds.clone(),
        });
        for (kind, handler) in &handlers {
            if handler.is_none() {
                tracing::warn!(batch = %id, %kind, "unsupported permission kind, counting it as denied");
                self.events.publish(BatchEvent::UnsupportedKind { batch: id, kind: *kind });
            }
        }

        // Subscribe before the precheck so no change slips in between.
        let watchers: StatusWatchers = handlers
            .iter()
            .filter_map(|(kind, handler)| handler.as_ref().map(|h| (*kind, h.subscribe())))
            .collect();

        let shared = Arc::new(SessionShared::new(
            id,
            items,
            handlers,
            Box::new(on_settled),
            self.events.clone(),
        ));

        if shared.try_settle() {
            tracing::debug!(batch = %id, "precheck found every item resolved");
            return BatchSession::new(shared, None);
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(batch = %id, "no tokio runtime, batch cannot settle");
            return BatchSession::new(shared, None);
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        runtime.spawn(driver::run(
            Arc::clone(&shared),
            receiver,
            watchers,
            self.debounce(),
        ));

        if self.config.auto_request {
            for (kind, handler) in shared.handlers() {
                if let Some(handler) = handler {
                    if handler.status() == AuthorizationStatus::NotDetermined {
                        handler.request_access(session_sink(*kind, Some(sender.clone())));
                    }
                }
            }
        }

        BatchSession::new(shared, Some(sender))
    }

    /// Current statuses of a session's items
    pub fn current_statuses(
        &self,
        session: &BatchSession,
    ) -> HashMap<PermissionKind, AuthorizationStatus> {
        session.current_statuses()
    }
}
