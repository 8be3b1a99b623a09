//! Batch event stream
//!
//! A broadcast-based event bus the presentation layer can subscribe to for
//! status changes while a batch is in flight. Publishing never blocks and
//! never fails; with no subscribers events are simply dropped.

use std::fmt;
use tokio::sync::broadcast;

use crate::permission::{AuthorizationStatus, PermissionKind};

/// Identifier of one batch session, unique per coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// Events emitted by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// A batch was started with these (deduplicated) kinds
    Started {
        batch: BatchId,
        kinds: Vec<PermissionKind>,
    },

    /// A requested kind has no handler and counts as denied
    UnsupportedKind {
        batch: BatchId,
        kind: PermissionKind,
    },

    /// A handler delivered a resolution
    StatusChanged {
        batch: BatchId,
        kind: PermissionKind,
        status: AuthorizationStatus,
    },

    /// A handler delivered the same resolution again
    DuplicateResolution {
        batch: BatchId,
        kind: PermissionKind,
        status: AuthorizationStatus,
    },

    /// Every item is terminal; fired once per batch
    Settled {
        batch: BatchId,
        statuses: Vec<(PermissionKind, AuthorizationStatus)>,
    },
}

impl BatchEvent {
    pub fn batch(&self) -> BatchId {
        match self {
            Self::Started { batch, .. }
            | Self::UnsupportedKind { batch, .. }
            | Self::StatusChanged { batch, .. }
            | Self::DuplicateResolution { batch, .. }
            | Self::Settled { batch, .. } => *batch,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::UnsupportedKind { .. } => "unsupported_kind",
            Self::StatusChanged { .. } => "status_changed",
            Self::DuplicateResolution { .. } => "duplicate_resolution",
            Self::Settled { .. } => "settled",
        }
    }
}

/// Event bus for batch events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BatchEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with the specified capacity
    ///
    /// The capacity determines how many events can be buffered before
    /// slow subscribers start losing events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, capacity }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of active receivers. Returns 0 if there are none.
    pub fn publish(&self, event: BatchEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
