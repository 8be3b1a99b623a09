//! Tests for the batch coordinator

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

use super::*;
use crate::permission::{PlatformHandler, ResolutionSink};
use crate::testing::{FakePlatform, ScriptedBehavior, ScriptedHandler};

struct Fixture {
    coordinator: BatchCoordinator,
    settled: Arc<AtomicUsize>,
}

impl Fixture {
    fn new(handlers: Vec<Arc<ScriptedHandler>>, config: CoordinatorConfig) -> Self {
        let registry = HandlerRegistry::new();
        for handler in handlers {
            registry.insert(handler);
        }
        Self {
            coordinator: BatchCoordinator::with_config(Arc::new(registry), config),
            settled: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn begin(&self, kinds: &[PermissionKind]) -> BatchSession {
        let settled = self.settled.clone();
        let items = kinds.iter().copied().map(PermissionRequestItem::new).collect();
        self.coordinator.begin_batch(items, move || {
            settled.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn settle_count(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }
}

fn scripted(kind: PermissionKind, status: AuthorizationStatus) -> Arc<ScriptedHandler> {
    Arc::new(ScriptedHandler::new(kind, status))
}

fn scripted_with(
    kind: PermissionKind,
    status: AuthorizationStatus,
    behavior: ScriptedBehavior,
) -> Arc<ScriptedHandler> {
    Arc::new(ScriptedHandler::new(kind, status).with_behavior(behavior))
}

/// Let the session driver drain its channel
async fn drain() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_precheck_settles_synchronously() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::Granted);
    let photos = scripted(PermissionKind::Photos, AuthorizationStatus::Granted);
    let fixture = Fixture::new(vec![camera.clone(), photos.clone()], CoordinatorConfig::default());

    let session = fixture.begin(&[PermissionKind::Camera, PermissionKind::Photos]);

    assert_eq!(fixture.settle_count(), 1);
    assert!(session.is_settled());
    assert_eq!(session.phase(), BatchPhase::Settled);
    assert_eq!(camera.request_count(), 0);
    assert_eq!(photos.request_count(), 0);
}

#[test]
fn test_precheck_settles_without_runtime() {
    let health = scripted(PermissionKind::Health, AuthorizationStatus::Granted);
    let fixture = Fixture::new(vec![health], CoordinatorConfig::default());

    let session = fixture.begin(&[PermissionKind::Health]);
    assert_eq!(fixture.settle_count(), 1);
    assert_eq!(
        session.current_statuses().get(&PermissionKind::Health),
        Some(&AuthorizationStatus::Granted)
    );
}

#[test]
fn test_empty_batch_settles_immediately() {
    let fixture = Fixture::new(vec![], CoordinatorConfig::default());
    let session = fixture.begin(&[]);
    assert_eq!(fixture.settle_count(), 1);
    assert!(session.current_statuses().is_empty());
}

#[tokio::test]
async fn test_settles_once_all_items_resolve() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let photos = scripted(PermissionKind::Photos, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera.clone(), photos.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Camera, PermissionKind::Photos]);
    assert_eq!(session.phase(), BatchPhase::AwaitingUserInput);

    session.request(PermissionKind::Camera);
    camera.resolve(AuthorizationStatus::Granted);
    drain().await;
    assert_eq!(fixture.settle_count(), 0);

    session.request(PermissionKind::Photos);
    photos.resolve(AuthorizationStatus::Denied);
    drain().await;
    assert_eq!(fixture.settle_count(), 1);
    assert!(session.is_settled());
}

#[tokio::test]
async fn test_duplicate_resolution_does_not_settle_twice() {
    let camera = scripted_with(
        PermissionKind::Camera,
        AuthorizationStatus::NotDetermined,
        ScriptedBehavior::ImmediateTwice(AuthorizationStatus::Granted),
    );
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Camera]);
    session.request(PermissionKind::Camera);
    drain().await;

    assert!(camera.resolve_again());
    session.request(PermissionKind::Camera);
    drain().await;

    assert_eq!(fixture.settle_count(), 1);
}

#[tokio::test]
async fn test_duplicate_before_settlement_is_reported() {
    let camera = scripted_with(
        PermissionKind::Camera,
        AuthorizationStatus::NotDetermined,
        ScriptedBehavior::ImmediateTwice(AuthorizationStatus::Granted),
    );
    let photos = scripted(PermissionKind::Photos, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera, photos], CoordinatorConfig::immediate());
    let mut events = fixture.coordinator.subscribe();

    let session = fixture.begin(&[PermissionKind::Camera, PermissionKind::Photos]);
    session.request(PermissionKind::Camera);
    drain().await;

    let mut seen = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => seen.push(event.event_type()),
            Err(TryRecvError::Empty) => break,
            Err(e) => panic!("unexpected receive error: {e}"),
        }
    }
    assert_eq!(
        seen,
        vec!["started", "status_changed", "duplicate_resolution"]
    );
    assert_eq!(fixture.settle_count(), 0);
}

#[tokio::test]
async fn test_unsupported_kind_counts_as_denied() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::immediate());
    let bogus = PermissionKind::Custom("bogus");

    let session = fixture.begin(&[bogus, PermissionKind::Camera]);
    assert_eq!(fixture.settle_count(), 0);
    assert_eq!(
        session.current_statuses().get(&bogus),
        Some(&AuthorizationStatus::Denied)
    );

    session.request(bogus);
    session.request(PermissionKind::Camera);
    camera.resolve(AuthorizationStatus::Granted);
    drain().await;

    assert_eq!(fixture.settle_count(), 1);
    let outcome = session.outcome();
    assert_eq!(outcome.denied, vec![bogus]);
    assert_eq!(outcome.granted, vec![PermissionKind::Camera]);
}

#[tokio::test]
async fn test_limited_counts_as_terminal() {
    let photos = scripted_with(
        PermissionKind::Photos,
        AuthorizationStatus::NotDetermined,
        ScriptedBehavior::Immediate(AuthorizationStatus::Limited),
    );
    let camera = scripted_with(
        PermissionKind::Camera,
        AuthorizationStatus::NotDetermined,
        ScriptedBehavior::Immediate(AuthorizationStatus::Granted),
    );
    let fixture = Fixture::new(vec![photos.clone(), camera.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Photos, PermissionKind::Camera]);
    session.request_all();
    drain().await;

    assert_eq!(fixture.settle_count(), 1);
    assert_eq!(photos.request_count(), 1);
    let outcome = session.outcome();
    assert_eq!(outcome.limited, vec![PermissionKind::Photos]);
    assert!(outcome.all_granted());
}

#[tokio::test]
async fn test_aggregate_uses_fresh_status_not_delivered_status() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Camera]);
    // A resolution whose handler has not committed anything yet
    session.sink(PermissionKind::Camera).resolve(AuthorizationStatus::Granted);
    drain().await;
    assert_eq!(fixture.settle_count(), 0);

    camera.set_status(AuthorizationStatus::Granted);
    session.sink(PermissionKind::Camera).resolve(AuthorizationStatus::Granted);
    drain().await;
    assert_eq!(fixture.settle_count(), 1);
}

#[tokio::test]
async fn test_auto_request_prompts_undecided_kinds() {
    let camera = scripted_with(
        PermissionKind::Camera,
        AuthorizationStatus::NotDetermined,
        ScriptedBehavior::Immediate(AuthorizationStatus::Denied),
    );
    let contacts = scripted(PermissionKind::Contacts, AuthorizationStatus::Granted);
    let fixture = Fixture::new(
        vec![camera.clone(), contacts.clone()],
        CoordinatorConfig::immediate().with_auto_request(true),
    );

    let session = fixture.begin(&[PermissionKind::Camera, PermissionKind::Contacts]);
    session.wait_settled().await;

    assert_eq!(fixture.settle_count(), 1);
    assert_eq!(camera.request_count(), 1);
    assert_eq!(contacts.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_settle_check_waits_for_debounce() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(
        vec![camera.clone()],
        CoordinatorConfig::default().with_settle_delay(Duration::from_millis(200)),
    );

    let session = fixture.begin(&[PermissionKind::Camera]);
    session.request(PermissionKind::Camera);
    camera.resolve(AuthorizationStatus::Granted);
    drain().await;
    assert_eq!(fixture.settle_count(), 0);

    tokio::time::advance(Duration::from_millis(150)).await;
    drain().await;
    assert_eq!(fixture.settle_count(), 0);

    tokio::time::advance(Duration::from_millis(60)).await;
    drain().await;
    assert_eq!(fixture.settle_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_sees_late_platform_commit() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::default());

    let session = fixture.begin(&[PermissionKind::Camera]);
    // Resolution arrives before the platform commits its status
    session.sink(PermissionKind::Camera).resolve(AuthorizationStatus::Granted);
    drain().await;
    camera.set_status(AuthorizationStatus::Granted);

    session.wait_settled().await;
    assert_eq!(fixture.settle_count(), 1);
}

#[tokio::test]
async fn test_wait_settled_returns_outcome() {
    let location = scripted(PermissionKind::Location, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![location.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Location]);
    session.request(PermissionKind::Location);

    let waiter = tokio::spawn({
        let location = location.clone();
        async move {
            drain().await;
            location.resolve(AuthorizationStatus::Limited);
        }
    });

    let outcome = session.wait_settled().await;
    waiter.await.unwrap();
    assert_eq!(outcome.limited, vec![PermissionKind::Location]);
    assert!(outcome.is_settled());
}

#[tokio::test]
async fn test_duplicate_kinds_collapse() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Camera, PermissionKind::Camera]);
    assert_eq!(session.items().len(), 2);
    assert_eq!(session.current_statuses().len(), 1);

    session.request(PermissionKind::Camera);
    camera.resolve(AuthorizationStatus::Granted);
    drain().await;
    assert_eq!(fixture.settle_count(), 1);
}

#[tokio::test]
async fn test_handlers_are_created_lazily_per_batch() {
    let registry = Arc::new(HandlerRegistry::new());
    registry.register_factory(PermissionKind::Camera, || -> SharedPermissionHandler {
        Arc::new(ScriptedHandler::new(
            PermissionKind::Camera,
            AuthorizationStatus::Granted,
        ))
    });
    registry.register_factory(PermissionKind::Health, || -> SharedPermissionHandler {
        Arc::new(ScriptedHandler::new(
            PermissionKind::Health,
            AuthorizationStatus::Granted,
        ))
    });
    let coordinator = BatchCoordinator::new(registry.clone());

    assert!(coordinator.handler_for(PermissionKind::Camera).is_none());
    let first = coordinator.begin_batch(vec![PermissionKind::Camera.into()], || {});
    let handler = coordinator.handler_for(PermissionKind::Camera).unwrap();
    assert!(!registry.is_registered(PermissionKind::Health));

    let second = coordinator.begin_batch(vec![PermissionKind::Camera.into()], || {});
    assert!(Arc::ptr_eq(
        &handler,
        &coordinator.handler_for(PermissionKind::Camera).unwrap()
    ));
    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn test_platform_handler_on_background_thread() {
    let platform = FakePlatform::new(AuthorizationStatus::NotDetermined)
        .answering(AuthorizationStatus::Granted)
        .on_background_thread();
    let registry = HandlerRegistry::new();
    registry.insert(Arc::new(PlatformHandler::new(
        PermissionKind::Microphone,
        platform.clone(),
    )));
    let coordinator =
        BatchCoordinator::with_config(Arc::new(registry), CoordinatorConfig::immediate());

    let session = coordinator.begin_batch(vec![PermissionKind::Microphone.into()], || {});
    session.request(PermissionKind::Microphone);

    let outcome = tokio::time::timeout(Duration::from_secs(5), session.wait_settled())
        .await
        .unwrap();
    assert_eq!(outcome.granted, vec![PermissionKind::Microphone]);
    assert_eq!(platform.prompt_count(), 1);
}

#[tokio::test]
async fn test_settled_event_carries_statuses() {
    let camera = scripted_with(
        PermissionKind::Camera,
        AuthorizationStatus::NotDetermined,
        ScriptedBehavior::Immediate(AuthorizationStatus::Denied),
    );
    let fixture = Fixture::new(vec![camera], CoordinatorConfig::immediate());
    let mut events = fixture.coordinator.subscribe();

    let session = fixture.begin(&[PermissionKind::Camera]);
    session.request(PermissionKind::Camera);
    session.wait_settled().await;

    let mut settled = None;
    while let Ok(event) = events.try_recv() {
        if let BatchEvent::Settled { statuses, .. } = event {
            settled = Some(statuses);
        }
    }
    assert_eq!(
        settled,
        Some(vec![(PermissionKind::Camera, AuthorizationStatus::Denied)])
    );
}

#[tokio::test]
async fn test_abandoned_batch_never_settles() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Camera]);
    drop(session);
    drain().await;

    // The driver has exited and released the unfired callback
    assert_eq!(Arc::strong_count(&fixture.settled), 1);
    camera.set_status(AuthorizationStatus::Granted);
    drain().await;
    assert_eq!(fixture.settle_count(), 0);
}

#[tokio::test]
async fn test_outstanding_sink_keeps_batch_alive() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Camera]);
    session.request(PermissionKind::Camera);
    drop(session);
    drain().await;

    assert_eq!(camera.resolve(AuthorizationStatus::Denied), 1);
    drain().await;
    assert_eq!(fixture.settle_count(), 1);
}

#[tokio::test]
async fn test_batches_sharing_a_handler_both_settle() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::immediate());

    let first = fixture.begin(&[PermissionKind::Camera]);
    let second = fixture.begin(&[PermissionKind::Camera]);

    // The user answers through the first batch only
    first.request(PermissionKind::Camera);
    camera.resolve(AuthorizationStatus::Granted);
    drain().await;

    assert!(first.is_settled());
    assert!(second.is_settled());
    assert_eq!(fixture.settle_count(), 2);
}

#[tokio::test]
async fn test_request_through_handler_for_settles_batch() {
    let camera = scripted_with(
        PermissionKind::Camera,
        AuthorizationStatus::NotDetermined,
        ScriptedBehavior::Immediate(AuthorizationStatus::Denied),
    );
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Camera]);
    let handler = fixture.coordinator.handler_for(PermissionKind::Camera).unwrap();
    handler.request_access(ResolutionSink::detached(PermissionKind::Camera));

    let outcome = tokio::time::timeout(Duration::from_secs(5), session.wait_settled())
        .await
        .unwrap();
    assert_eq!(outcome.denied, vec![PermissionKind::Camera]);
    assert_eq!(fixture.settle_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_change_without_resolution_is_debounced() {
    let photos = scripted(PermissionKind::Photos, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![photos.clone()], CoordinatorConfig::default());

    let session = fixture.begin(&[PermissionKind::Photos]);
    drain().await;
    photos.set_status(AuthorizationStatus::Limited);
    drain().await;
    assert_eq!(fixture.settle_count(), 0);

    tokio::time::advance(DebouncePolicy::DEFAULT_DELAY).await;
    drain().await;
    assert_eq!(fixture.settle_count(), 1);
    assert_eq!(session.outcome().limited, vec![PermissionKind::Photos]);
}

#[test]
fn test_undecided_batch_without_runtime_does_not_panic() {
    let camera = scripted(PermissionKind::Camera, AuthorizationStatus::NotDetermined);
    let fixture = Fixture::new(vec![camera.clone()], CoordinatorConfig::immediate());

    let session = fixture.begin(&[PermissionKind::Camera]);
    session.request(PermissionKind::Camera);
    camera.resolve(AuthorizationStatus::Granted);

    assert!(!session.is_settled());
    assert_eq!(fixture.settle_count(), 0);
    assert_eq!(
        session.current_statuses().get(&PermissionKind::Camera),
        Some(&AuthorizationStatus::Granted)
    );
}
