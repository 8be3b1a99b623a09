//! Session driver: the serialized context a batch runs on
//!
//! Every resolution for a batch arrives here through the session channel,
//! whatever thread the platform delivered it on. Status changes of the
//! batch's handlers arrive here too, so an answer given through another
//! batch or straight through a handler still settles this one. The driver is
//! the only place that reacts to either, so the settle check never runs
//! concurrently with itself for one batch.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_stream::{StreamExt, StreamMap};
use tokio_stream::wrappers::WatchStream;

use super::debounce::DebouncePolicy;
use super::session::{SessionMessage, SessionShared};
use crate::events::BatchEvent;
use crate::permission::{AuthorizationStatus, PermissionKind};

/// Status receivers of a batch's handlers, subscribed before the precheck
pub(crate) type StatusWatchers = Vec<(PermissionKind, watch::Receiver<AuthorizationStatus>)>;

pub(crate) async fn run(
    shared: Arc<SessionShared>,
    mut messages: mpsc::UnboundedReceiver<SessionMessage>,
    watchers: StatusWatchers,
    debounce: DebouncePolicy,
) {
    let batch = shared.id();
    let mut delivered: HashMap<PermissionKind, AuthorizationStatus> = HashMap::new();
    let mut checks: VecDeque<Instant> = VecDeque::new();
    let mut open = true;

    let mut changes = StreamMap::new();
    for (kind, receiver) in watchers {
        changes.insert(kind, WatchStream::from_changes(receiver));
    }

    tracing::debug!(%batch, delay = ?debounce.delay(), watched = changes.len(), "session driver started");

    loop {
        let next_check = checks.front().copied();

        // A wake-up from either source ends in the same debounced re-scan.
        let rescan = tokio::select! {
            message = messages.recv(), if open => {
                let Some(SessionMessage::Resolved { kind, status }) = message else {
                    open = false;
                    continue;
                };

                if shared.is_settled() {
                    tracing::debug!(%batch, %kind, %status, "resolution after settlement ignored");
                    continue;
                }

                if delivered.insert(kind, status) == Some(status) {
                    tracing::debug!(%batch, %kind, %status, "duplicate resolution");
                    shared.events().publish(BatchEvent::DuplicateResolution { batch, kind, status });
                } else {
                    tracing::debug!(%batch, %kind, %status, "resolution received");
                    shared.events().publish(BatchEvent::StatusChanged { batch, kind, status });
                }
                true
            }
            Some((kind, status)) = changes.next(), if open && !changes.is_empty() => {
                tracing::debug!(%batch, %kind, %status, "handler status changed");
                true
            }
            _ = sleep_until(next_check.unwrap_or_else(Instant::now)), if next_check.is_some() => {
                checks.pop_front();
                if shared.try_settle() {
                    break;
                }
                false
            }
            else => break,
        };

        if rescan {
            if debounce.is_immediate() {
                if shared.try_settle() {
                    break;
                }
            } else {
                checks.push_back(Instant::now() + debounce.delay());
            }
        }
    }

    if shared.is_settled() {
        tracing::debug!(%batch, "session driver finished");
    } else {
        tracing::debug!(%batch, "batch abandoned before settling");
    }
}
