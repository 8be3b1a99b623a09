//! Handler registry: lazily provisions one handler per permission kind

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::permission::{PermissionKind, SharedPermissionHandler};

/// Builds the handler for one kind on first need
pub type HandlerFactory = Arc<dyn Fn() -> SharedPermissionHandler + Send + Sync>;

/// Registry mapping permission kinds to handler instances.
///
/// Handlers are only constructed for kinds a batch actually asks for, and at
/// most one instance per kind ever exists. Factories run while the registry
/// is locked, so a factory must not call back into the registry.
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<PermissionKind, SharedPermissionHandler>>,
    factories: RwLock<HashMap<PermissionKind, HandlerFactory>>,
}

impl HandlerRegistry {
    /// Create an empty registry with no factories
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            factories: RwLock::new(HashMap::new()),
        }
    }

    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    /// Register the factory for a kind; replaces any earlier factory.
    ///
    /// An already constructed handler for the kind is kept.
    pub fn register_factory<F>(&self, kind: PermissionKind, factory: F)
    where
        F: Fn() -> SharedPermissionHandler + Send + Sync + 'static,
    {
        self.factories.write().insert(kind, Arc::new(factory));
    }

    pub fn has_factory(&self, kind: PermissionKind) -> bool {
        self.factories.read().contains_key(&kind)
    }

    /// Construct handlers for every kind not yet registered.
    ///
    /// Kinds without a factory are skipped and stay unsupported. Returns the
    /// kinds whose handlers were constructed by this call.
    pub fn ensure_registered<I>(&self, kinds: I) -> Vec<PermissionKind>
    where
        I: IntoIterator<Item = PermissionKind>,
    {
        let mut created = Vec::new();
        let mut handlers = self.handlers.write();

        for kind in kinds {
            if handlers.contains_key(&kind) {
                continue;
            }

            let factory = self.factories.read().get(&kind).cloned();
            let Some(factory) = factory else {
                tracing::warn!(%kind, "no handler factory registered for permission kind");
                continue;
            };

            let handler = factory();
            if handler.kind() != kind {
                tracing::warn!(
                    %kind,
                    handler_kind = %handler.kind(),
                    "factory produced a handler for a different kind"
                );
            }
            tracing::debug!(%kind, status = %handler.status(), "registered permission handler");
            handlers.insert(kind, handler);
            created.push(kind);
        }

        created
    }

    /// Register an already constructed handler.
    ///
    /// Returns `false` and keeps the existing instance if the kind is
    /// already registered.
    pub fn insert(&self, handler: SharedPermissionHandler) -> bool {
        let kind = handler.kind();
        let mut handlers = self.handlers.write();
        if handlers.contains_key(&kind) {
            return false;
        }
        handlers.insert(kind, handler);
        true
    }

    /// Get the handler for a kind; `None` means unsupported or never requested
    pub fn get(&self, kind: PermissionKind) -> Option<SharedPermissionHandler> {
        self.handlers.read().get(&kind).cloned()
    }

    pub fn is_registered(&self, kind: PermissionKind) -> bool {
        self.handlers.read().contains_key(&kind)
    }

    pub fn registered_kinds(&self) -> HashSet<PermissionKind> {
        self.handlers.read().keys().copied().collect()
    }

    /// Remove a handler; the next `ensure_registered` builds a fresh one.
    pub fn teardown(&self, kind: PermissionKind) -> Option<SharedPermissionHandler> {
        let removed = self.handlers.write().remove(&kind);
        if removed.is_some() {
            tracing::debug!(%kind, "tore down permission handler");
        }
        removed
    }

    pub fn statistics(&self) -> RegistryStatistics {
        RegistryStatistics {
            registered_handlers: self.handlers.read().len(),
            known_factories: self.factories.read().len(),
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<_> = self.registered_kinds().into_iter().collect();
        registered.sort();
        f.debug_struct("HandlerRegistry")
            .field("registered", &registered)
            .field("factories", &self.factories.read().len())
            .finish()
    }
}

/// Statistics about the handler registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStatistics {
    /// Number of constructed handlers
    pub registered_handlers: usize,
    /// Number of kinds that can be constructed on demand
    pub known_factories: usize,
}

/// Builder for a handler registry
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    factories: Vec<(PermissionKind, HandlerFactory)>,
    handlers: Vec<SharedPermissionHandler>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lazily constructed handler
    pub fn with_factory<F>(mut self, kind: PermissionKind, factory: F) -> Self
    where
        F: Fn() -> SharedPermissionHandler + Send + Sync + 'static,
    {
        self.factories.push((kind, Arc::new(factory)));
        self
    }

    /// Add an eagerly constructed handler
    pub fn with_handler(mut self, handler: SharedPermissionHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> HandlerRegistry {
        let registry = HandlerRegistry::new();
        {
            let mut factories = registry.factories.write();
            for (kind, factory) in self.factories {
                factories.insert(kind, factory);
            }
        }
        for handler in self.handlers {
            registry.insert(handler);
        }
        registry
    }
}
