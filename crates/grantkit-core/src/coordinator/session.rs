//! Batch session state and the caller-facing session handle

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};

use crate::events::{BatchEvent, BatchId, EventBus};
use crate::permission::{
    AuthorizationStatus, PermissionKind, PermissionRequestItem, ResolutionSink,
    SharedPermissionHandler,
};

pub(crate) type SettleCallback = Box<dyn FnOnce() + Send + 'static>;

/// Messages marshalled onto a session driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionMessage {
    Resolved {
        kind: PermissionKind,
        status: AuthorizationStatus,
    },
}

/// Lifecycle phase of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchPhase {
    /// At least one item is still `NotDetermined`
    AwaitingUserInput,
    /// Every item is terminal and the settle callback has fired
    Settled,
}

/// State shared between a session handle and its driver
pub(crate) struct SessionShared {
    id: BatchId,
    items: Vec<PermissionRequestItem>,
    /// Deduplicated kinds in request order; `None` marks an unsupported kind
    handlers: Vec<(PermissionKind, Option<SharedPermissionHandler>)>,
    settled: AtomicBool,
    on_settled: Mutex<Option<SettleCallback>>,
    phase: watch::Sender<BatchPhase>,
    events: EventBus,
}

impl SessionShared {
    pub(crate) fn new(
        id: BatchId,
        items: Vec<PermissionRequestItem>,
        handlers: Vec<(PermissionKind, Option<SharedPermissionHandler>)>,
        on_settled: SettleCallback,
        events: EventBus,
    ) -> Self {
        let (phase, _) = watch::channel(BatchPhase::AwaitingUserInput);
        Self {
            id,
            items,
            handlers,
            settled: AtomicBool::new(false),
            on_settled: Mutex::new(Some(on_settled)),
            phase,
            events,
        }
    }

    pub(crate) fn id(&self) -> BatchId {
        self.id
    }

    pub(crate) fn kinds(&self) -> Vec<PermissionKind> {
        self.handlers.iter().map(|(kind, _)| *kind).collect()
    }

    pub(crate) fn handlers(&self) -> &[(PermissionKind, Option<SharedPermissionHandler>)] {
        &self.handlers
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.settled.load(Ordering::SeqCst)
    }

    /// Fresh read of every handler; unsupported kinds count as denied
    pub(crate) fn scan(&self) -> Vec<(PermissionKind, AuthorizationStatus)> {
        self.handlers
            .iter()
            .map(|(kind, handler)| {
                let status = handler
                    .as_ref()
                    .map(|h| h.status())
                    .unwrap_or(AuthorizationStatus::Denied);
                (*kind, status)
            })
            .collect()
    }

    /// Re-scan the aggregate and fire the settle callback if it is complete.
    ///
    /// Returns true only for the call that actually settled the batch.
    pub(crate) fn try_settle(&self) -> bool {
        let statuses = self.scan();
        if statuses.iter().any(|(_, status)| !status.is_terminal()) {
            tracing::debug!(batch = %self.id, "batch still awaiting user input");
            return false;
        }

        if self.settled.swap(true, Ordering::SeqCst) {
            return false;
        }

        tracing::info!(batch = %self.id, items = statuses.len(), "permission batch settled");
        self.phase.send_replace(BatchPhase::Settled);

        let callback = self.on_settled.lock().take();
        if let Some(callback) = callback {
            callback();
        }

        self.events.publish(BatchEvent::Settled {
            batch: self.id,
            statuses,
        });
        true
    }
}

/// Handle to one in-flight batch request.
///
/// The presentation layer uses it to trigger prompts and read statuses.
/// Dropping the handle abandons the batch once no handler still holds a
/// resolution sink for it; an abandoned batch never fires its callback.
pub struct BatchSession {
    shared: Arc<SessionShared>,
    sender: Option<mpsc::UnboundedSender<SessionMessage>>,
    phase: watch::Receiver<BatchPhase>,
}

impl BatchSession {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        sender: Option<mpsc::UnboundedSender<SessionMessage>>,
    ) -> Self {
        let phase = shared.phase.subscribe();
        Self {
            shared,
            sender,
            phase,
        }
    }

    pub fn id(&self) -> BatchId {
        self.shared.id
    }

    /// Items in the order the caller supplied them
    pub fn items(&self) -> &[PermissionRequestItem] {
        &self.shared.items
    }

    pub fn phase(&self) -> BatchPhase {
        *self.phase.borrow()
    }

    pub fn is_settled(&self) -> bool {
        self.shared.is_settled()
    }

    /// Handler bound to a kind of this batch, if it is supported
    pub fn handler(&self, kind: PermissionKind) -> Option<SharedPermissionHandler> {
        self.shared
            .handlers
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, handler)| handler.clone())
    }

    /// Current status of every kind in the batch; callable at any time
    pub fn current_statuses(&self) -> HashMap<PermissionKind, AuthorizationStatus> {
        self.shared.scan().into_iter().collect()
    }

    /// Current statuses partitioned by outcome
    pub fn outcome(&self) -> BatchOutcome {
        BatchOutcome::from_statuses(self.shared.scan())
    }

    /// Trigger the prompt for one kind of this batch.
    ///
    /// Kinds outside the batch, or without a handler, are ignored.
    pub fn request(&self, kind: PermissionKind) {
        match self.handler(kind) {
            Some(handler) => {
                tracing::debug!(batch = %self.id(), %kind, "requesting access");
                handler.request_access(self.sink(kind));
            }
            None => {
                tracing::warn!(batch = %self.id(), %kind, "request for kind without a handler in this batch ignored");
            }
        }
    }

    /// Trigger the prompt for every kind that is still `NotDetermined`
    pub fn request_all(&self) {
        for (kind, handler) in self.shared.handlers.iter() {
            if let Some(handler) = handler {
                if !handler.status().is_terminal() {
                    handler.request_access(self.sink(*kind));
                }
            }
        }
    }

    /// Wait until the batch settles and return its outcome
    pub async fn wait_settled(&self) -> BatchOutcome {
        let mut phase = self.phase.clone();
        if phase
            .wait_for(|phase| *phase == BatchPhase::Settled)
            .await
            .is_err()
        {
            tracing::debug!(batch = %self.id(), "phase channel closed before settling");
        }
        self.outcome()
    }

    /// Resolution sink delivering into this session's driver
    pub fn sink(&self, kind: PermissionKind) -> ResolutionSink {
        session_sink(kind, self.sender.clone())
    }
}

impl fmt::Debug for BatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchSession")
            .field("id", &self.id())
            .field("kinds", &self.shared.kinds())
            .field("phase", &self.phase())
            .finish()
    }
}

pub(crate) fn session_sink(
    kind: PermissionKind,
    sender: Option<mpsc::UnboundedSender<SessionMessage>>,
) -> ResolutionSink {
    match sender {
        Some(sender) => ResolutionSink::new(kind, move |kind, status| {
            // Send fails once the driver has settled; late resolutions are dropped.
            let _ = sender.send(SessionMessage::Resolved { kind, status });
        }),
        None => ResolutionSink::detached(kind),
    }
}

/// Statuses of a batch partitioned by outcome, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub granted: Vec<PermissionKind>,
    pub limited: Vec<PermissionKind>,
    pub denied: Vec<PermissionKind>,
    pub pending: Vec<PermissionKind>,
}

impl BatchOutcome {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = (PermissionKind, AuthorizationStatus)>,
    {
        let mut outcome = Self::default();
        for (kind, status) in statuses {
            match status {
                AuthorizationStatus::Granted => outcome.granted.push(kind),
                AuthorizationStatus::Limited => outcome.limited.push(kind),
                AuthorizationStatus::Denied => outcome.denied.push(kind),
                AuthorizationStatus::NotDetermined => outcome.pending.push(kind),
            }
        }
        outcome
    }

    /// No kind is waiting for an answer
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Every kind has at least partial access
    pub fn all_granted(&self) -> bool {
        self.pending.is_empty() && self.denied.is_empty()
    }
}
