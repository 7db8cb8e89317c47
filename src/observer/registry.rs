// Observer registry: (model, ring) -> observers, built once and never re-scanned
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::observer::traits::{Observer, ObserverRing};
use crate::types::Operation;

/// Which models a registered observer applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObserverScope {
    Model(String),
    Universal,
}

/// Registration record: an observer tagged with its scope
#[derive(Clone)]
pub struct RegisteredObserver {
    pub scope: ObserverScope,
    pub observer: Arc<dyn Observer>,
}

/// Discovers observers and registers them ahead of first use
pub trait ObserverLoader {
    fn load(&self, registry: &mut ObserverRegistryBuilder);
}

impl<F> ObserverLoader for F
where
    F: Fn(&mut ObserverRegistryBuilder),
{
    fn load(&self, registry: &mut ObserverRegistryBuilder) {
        self(registry)
    }
}

/// Mutable registration phase; `build` freezes it into an [`ObserverRegistry`]
#[derive(Default)]
pub struct ObserverRegistryBuilder {
    entries: HashMap<(ObserverScope, ObserverRing), Vec<Arc<dyn Observer>>>,
    count: usize,
}

impl ObserverRegistryBuilder {
    /// Register an observer for one model
    pub fn register(&mut self, model: impl Into<String>, observer: Arc<dyn Observer>) -> &mut Self {
        self.insert(ObserverScope::Model(model.into()), observer)
    }

    /// Register an observer for every model
    pub fn register_universal(&mut self, observer: Arc<dyn Observer>) -> &mut Self {
        self.insert(ObserverScope::Universal, observer)
    }

    pub fn load(&mut self, loader: &dyn ObserverLoader) -> &mut Self {
        loader.load(self);
        self
    }

    fn insert(&mut self, scope: ObserverScope, observer: Arc<dyn Observer>) -> &mut Self {
        let ring = observer.ring();
        tracing::debug!("Registered observer '{}' for {} ({:?})", observer.name(), ring, scope);
        self.entries.entry((scope, ring)).or_default().push(observer);
        self.count += 1;
        self
    }

    pub fn build(self) -> ObserverRegistry {
        tracing::info!("Observer registry warmed up with {} observers", self.count);
        ObserverRegistry {
            entries: self.entries,
            count: self.count,
        }
    }
}

/// Immutable lookup of observers per (model, ring)
pub struct ObserverRegistry {
    entries: HashMap<(ObserverScope, ObserverRing), Vec<Arc<dyn Observer>>>,
    count: usize,
}

static GLOBAL_REGISTRY: OnceCell<Arc<ObserverRegistry>> = OnceCell::new();

impl ObserverRegistry {
    pub fn builder() -> ObserverRegistryBuilder {
        ObserverRegistryBuilder::default()
    }

    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// Build from a single loader
    pub fn from_loader(loader: &dyn ObserverLoader) -> Self {
        let mut builder = Self::builder();
        builder.load(loader);
        builder.build()
    }

    /// Process-wide registry; the loader only runs on the first call
    pub fn warm_up(loader: &dyn ObserverLoader) -> Arc<ObserverRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(Self::from_loader(loader)))
            .clone()
    }

    /// Observers for a model at one ring: model-specific first, then universal.
    /// Unknown models simply have no model-specific observers.
    pub fn observers(&self, model: &str, ring: ObserverRing) -> Vec<Arc<dyn Observer>> {
        let specific = self.entries.get(&(ObserverScope::Model(model.to_string()), ring));
        let universal = self.entries.get(&(ObserverScope::Universal, ring));

        specific
            .into_iter()
            .chain(universal)
            .flatten()
            .cloned()
            .collect()
    }

    /// Observers for a model at one ring that apply to the operation
    pub fn observers_for(&self, model: &str, ring: ObserverRing, operation: Operation) -> Vec<Arc<dyn Observer>> {
        self.observers(model, ring)
            .into_iter()
            .filter(|observer| observer.applies_to_operation(operation))
            .collect()
    }

    /// Flat view of every registration, for diagnostics
    pub fn registrations(&self) -> Vec<RegisteredObserver> {
        let mut all: Vec<(ObserverRing, RegisteredObserver)> = self
            .entries
            .iter()
            .flat_map(|((scope, ring), observers)| {
                observers.iter().map(move |observer| {
                    (*ring, RegisteredObserver { scope: scope.clone(), observer: Arc::clone(observer) })
                })
            })
            .collect();
        all.sort_by_key(|(ring, _)| *ring);
        all.into_iter().map(|(_, registered)| registered).collect()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
