//! Adapter-facing test doubles
//!
//! [`ScriptedHandler`] stands in for a whole per-kind adapter and lets a
//! test decide when and how each request resolves. [`FakePlatform`] stands
//! in for the platform primitive underneath a
//! [`PlatformHandler`](crate::permission::PlatformHandler).

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

use crate::error::{GrantError, GrantResult};
use crate::permission::{
    AuthorizationStatus, PermissionHandler, PermissionKind, PlatformAuthorization,
    PromptCompletion, ResolutionSink,
};

/// How a [`ScriptedHandler`] answers a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedBehavior {
    /// Park the request until the test calls [`ScriptedHandler::resolve`]
    Manual,
    /// Resolve synchronously with the given status
    Immediate(AuthorizationStatus),
    /// Resolve synchronously, then deliver the same resolution again
    ImmediateTwice(AuthorizationStatus),
}

/// Permission handler whose answers are scripted by the test
#[derive(Debug)]
pub struct ScriptedHandler {
    kind: PermissionKind,
    status: watch::Sender<AuthorizationStatus>,
    behavior: Mutex<ScriptedBehavior>,
    pending: Mutex<Vec<ResolutionSink>>,
    last_sink: Mutex<Option<ResolutionSink>>,
    requests: AtomicUsize,
}

impl ScriptedHandler {
    pub fn new(kind: PermissionKind, status: AuthorizationStatus) -> Self {
        let (status, _) = watch::channel(status);
        Self {
            kind,
            status,
            behavior: Mutex::new(ScriptedBehavior::Manual),
            pending: Mutex::new(Vec::new()),
            last_sink: Mutex::new(None),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn with_behavior(self, behavior: ScriptedBehavior) -> Self {
        *self.behavior.lock() = behavior;
        self
    }

    /// Change the status without delivering a resolution.
    ///
    /// Subscribers still observe the change, as they would when the user
    /// answers through another screen.
    pub fn set_status(&self, status: AuthorizationStatus) {
        self.status.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }

    /// Commit `status` and resolve every parked request.
    ///
    /// Returns the number of requests resolved.
    pub fn resolve(&self, status: AuthorizationStatus) -> usize {
        self.set_status(status);
        let sinks: Vec<_> = self.pending.lock().drain(..).collect();
        for sink in &sinks {
            sink.resolve(status);
        }
        if let Some(last) = sinks.last() {
            *self.last_sink.lock() = Some(last.clone());
        }
        sinks.len()
    }

    /// Deliver the current status again through the last used sink
    pub fn resolve_again(&self) -> bool {
        let sink = self.last_sink.lock().clone();
        match sink {
            Some(sink) => {
                sink.resolve(self.status());
                true
            }
            None => false,
        }
    }

    /// Number of `request_access` calls received
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of requests parked waiting for [`resolve`](Self::resolve)
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl PermissionHandler for ScriptedHandler {
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
        self.requests.fetch_add(1, Ordering::SeqCst);

        let current = self.status();
        if current.is_terminal() {
            *self.last_sink.lock() = Some(sink.clone());
            sink.resolve(current);
            return;
        }

        let behavior = *self.behavior.lock();
        match behavior {
            ScriptedBehavior::Manual => self.pending.lock().push(sink),
            ScriptedBehavior::Immediate(status) => {
                self.set_status(status);
                *self.last_sink.lock() = Some(sink.clone());
                sink.resolve(status);
            }
            ScriptedBehavior::ImmediateTwice(status) => {
                self.set_status(status);
                *self.last_sink.lock() = Some(sink.clone());
                sink.resolve(status);
                sink.resolve(status);
            }
        }
    }
}

#[derive(Debug)]
struct FakePlatformState {
    status: Mutex<AuthorizationStatus>,
    answer: Mutex<GrantResult<AuthorizationStatus>>,
    read_error: Mutex<Option<GrantError>>,
    prompts: AtomicUsize,
    background: bool,
}

/// Platform primitive with a scripted prompt answer.
///
/// Cloning shares state, so a test can keep a copy after handing one to a
/// [`PlatformHandler`](crate::permission::PlatformHandler).
#[derive(Debug, Clone)]
pub struct FakePlatform {
    state: Arc<FakePlatformState>,
}

impl FakePlatform {
    /// A platform currently reporting `status` whose prompt answers `Granted`
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            state: Arc::new(FakePlatformState {
                status: Mutex::new(status),
                answer: Mutex::new(Ok(AuthorizationStatus::Granted)),
                read_error: Mutex::new(None),
                prompts: AtomicUsize::new(0),
                background: false,
            }),
        }
    }

    /// Deliver prompt completions from a separate OS thread
    pub fn on_background_thread(self) -> Self {
        let state = FakePlatformState {
            status: Mutex::new(*self.state.status.lock()),
            answer: Mutex::new(self.state.answer.lock().clone()),
            read_error: Mutex::new(self.state.read_error.lock().clone()),
            prompts: AtomicUsize::new(self.prompt_count()),
            background: true,
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// Set what the next prompts answer
    pub fn answering(self, status: AuthorizationStatus) -> Self {
        *self.state.answer.lock() = Ok(status);
        self
    }

    /// Make prompts fail with `error`
    pub fn failing_prompt(self, error: GrantError) -> Self {
        *self.state.answer.lock() = Err(error);
        self
    }

    /// Make status reads fail with `error`
    pub fn failing_reads(self, error: GrantError) -> Self {
        *self.state.read_error.lock() = Some(error);
        self
    }

    pub fn set_status(&self, status: AuthorizationStatus) {
        *self.state.status.lock() = status;
    }

    pub fn prompt_count(&self) -> usize {
        self.state.prompts.load(Ordering::SeqCst)
    }
}

impl PlatformAuthorization for FakePlatform {
    fn current_status(&self) -> GrantResult<AuthorizationStatus> {
        if let Some(error) = self.state.read_error.lock().clone() {
            return Err(error);
        }
        Ok(*self.state.status.lock())
    }

    fn prompt(&self, completion: PromptCompletion) {
        self.state.prompts.fetch_add(1, Ordering::SeqCst);

        let answer = self.state.answer.lock().clone();
        if let Ok(status) = &answer {
            *self.state.status.lock() = *status;
        }

        if self.state.background {
            std::thread::spawn(move || completion(answer));
        } else {
            completion(answer);
        }
    }
}
