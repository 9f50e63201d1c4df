//! The `Registry`: a synchronous monitor over the dependency graph that
//! delivers load and unload notifications.

use crate::bridge::{DependentObject, ObjectBridge};
use crate::config::RegistryConfig;
use crate::dependency::Provider;
use crate::error::{Error, Result};
use crate::graph::{Delivery, Dependent, DependencyGraph, DependentId};
use crate::lifecycle::{Component, ComponentHandle};
use parking_lot::ReentrantMutex;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Default)]
struct RegistryState {
  graph: DependencyGraph,
  // Subscribed plain objects, keyed by the address of their shared allocation.
  bridges: HashMap<usize, DependentId>,
}

/// Counts taken from a registry at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryStats {
  pub providers: usize,
  pub dependents: usize,
  /// Names that somebody waits on but no provider currently holds.
  pub unresolved: Vec<String>,
}

/// Registry of named providers and the dependents waiting on them.
///
/// Every operation runs under one reentrant lock, so operations from
/// different threads never interleave while callbacks running on the
/// locking thread may call back into the registry. Callbacks always run on
/// the caller's thread before the triggering call returns.
///
/// ```
/// use fibre_components::{Provider, Registry};
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// let logger = Provider::new("Logger", Arc::new(String::from("stdout")));
/// registry.register(logger.clone()).unwrap();
///
/// assert_eq!(*registry.get_as::<String>("Logger").unwrap(), "stdout");
/// assert!(registry.register(Provider::new("Logger", Arc::new(0u8))).is_err());
///
/// registry.unregister(&logger).unwrap();
/// assert!(registry.lookup("Logger").is_err());
/// ```
pub struct Registry {
  config: RegistryConfig,
  state: ReentrantMutex<RefCell<RegistryState>>,
}

impl Registry {
  /// Creates a new, empty registry with the default configuration.
  pub fn new() -> Arc<Self> {
    Self::with_config(RegistryConfig::default())
  }

  pub fn with_config(config: RegistryConfig) -> Arc<Self> {
    Arc::new(Self {
      config,
      state: ReentrantMutex::new(RefCell::new(RegistryState::default())),
    })
  }

  pub fn config(&self) -> &RegistryConfig {
    &self.config
  }

  // --- PRIVATE HELPERS ---

  /// Runs `f` with exclusive access to the bookkeeping. `f` must not call
  /// back into anything that can reach the registry.
  fn with_state<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
    let guard = self.state.lock();
    let mut state = guard.borrow_mut();
    f(&mut state)
  }

  fn with_graph<R>(&self, f: impl FnOnce(&mut DependencyGraph) -> R) -> R {
    self.with_state(|state| f(&mut state.graph))
  }

  /// Runs `f` inside the registry's monitor. Nested registry calls made by
  /// `f` on this thread are allowed.
  pub(crate) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
    let _monitor = self.state.lock();
    f()
  }

  // --- Providers ---

  /// Registers `provider` under its name and notifies everyone waiting on it.
  ///
  /// Fails with [`Error::EmptyName`] or [`Error::DuplicateName`] without
  /// touching the registry. If a callback fails, the remaining waiters are
  /// still notified, the registration stays in place, and the first error is
  /// returned.
  pub fn register(&self, provider: Provider) -> Result<()> {
    let _monitor = self.state.lock();
    let (epoch, waiters) = self.with_graph(|graph| {
      let epoch = graph.insert_provider(provider.clone())?;
      Ok::<_, Error>((epoch, graph.waiters_of(provider.name())))
    })?;
    tracing::debug!(
      registry = %self.config.label,
      name = %provider.name(),
      kind = %provider.type_name(),
      waiters = waiters.len(),
      "registered provider"
    );

    let mut outcome = Ok(());
    for (id, dependent) in waiters {
      let claimed = self.with_graph(|graph| graph.claim_load(provider.name(), Some(epoch), id));
      if let Some(provider) = claimed {
        let delivered = dependent.dependency_loaded(&provider);
        self.keep_first_failure(&mut outcome, provider.name(), id, delivered);
      }
    }
    outcome
  }

  /// Notifies everyone that saw `provider` load, then removes it.
  ///
  /// Fails with [`Error::UnknownProvider`] if this exact instance is not the
  /// one registered under its name. If a callback fails, the remaining
  /// dependents are still notified, the provider is still removed, and the
  /// first error is returned.
  pub fn unregister(&self, provider: &Provider) -> Result<()> {
    let _monitor = self.state.lock();
    let (epoch, notified) = self.with_graph(|graph| {
      let epoch = graph.retire_provider(provider)?;
      Ok::<_, Error>((epoch, graph.notified_of(provider.name(), epoch)))
    })?;
    tracing::debug!(
      registry = %self.config.label,
      name = %provider.name(),
      kind = %provider.type_name(),
      dependents = notified.len(),
      "unregistering provider"
    );

    let outcome = self.fan_out_unload(provider, epoch, notified);
    self.with_graph(|graph| graph.remove_provider(provider.name(), epoch));
    outcome
  }

  fn fan_out_unload(&self, provider: &Provider, epoch: u64, notified: Vec<Delivery>) -> Result<()> {
    let mut outcome = Ok(());
    for (id, dependent) in notified {
      if self.with_graph(|graph| graph.claim_unload(provider.name(), epoch, id)) {
        let delivered = dependent.dependency_unloaded(provider);
        self.keep_first_failure(&mut outcome, provider.name(), id, delivered);
      }
    }
    outcome
  }

  /// A failing dependent never stops delivery to the rest of the snapshot.
  fn keep_first_failure(&self, outcome: &mut Result<()>, name: &str, id: DependentId, delivered: Result<()>) {
    if let Err(err) = delivered {
      tracing::warn!(
        registry = %self.config.label,
        name = %name,
        dependent = %id,
        error = %err,
        "dependent failed to handle a notification"
      );
      if outcome.is_ok() {
        *outcome = Err(err);
      }
    }
  }

  /// The provider registered under `name`, if any.
  pub fn get(&self, name: &str) -> Option<Provider> {
    self.with_graph(|graph| graph.provider(name).cloned())
  }

  /// The provider registered under `name` as its concrete type.
  pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
    self.get(name).and_then(|provider| provider.downcast::<T>())
  }

  /// Like [`get`](Self::get), but reports a missing provider as
  /// [`Error::ProviderNotFound`].
  pub fn lookup(&self, name: &str) -> Result<Provider> {
    self
      .get(name)
      .ok_or_else(|| Error::ProviderNotFound(name.to_string()))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.with_graph(|graph| graph.provider(name).is_some())
  }

  pub(crate) fn is_current(&self, provider: &Provider) -> bool {
    self.with_graph(|graph| graph.is_current(provider))
  }

  // --- Dependents ---

  /// Subscribes `dependent` for its names and replays every provider that is
  /// already registered before returning.
  pub(crate) fn subscribe(&self, id: DependentId, dependent: Arc<dyn Dependent>) -> Result<()> {
    let _monitor = self.state.lock();
    let names = dependent.dependency_names();
    self.with_graph(|graph| graph.insert_subscription(id, dependent.clone(), names.clone()))?;
    tracing::debug!(
      registry = %self.config.label,
      dependent = %id,
      names = ?names,
      "subscribed dependent"
    );

    let mut outcome = Ok(());
    for name in &names {
      let claimed = self.with_graph(|graph| graph.claim_load(name, None, id));
      if let Some(provider) = claimed {
        let delivered = dependent.dependency_loaded(&provider);
        self.keep_first_failure(&mut outcome, name, id, delivered);
      }
    }
    outcome
  }

  /// Forgets `id`. No unload callbacks are emitted.
  pub(crate) fn unsubscribe(&self, id: DependentId) -> Result<()> {
    let _monitor = self.state.lock();
    let dependent = self.with_graph(|graph| graph.remove_subscription(id))?;
    tracing::debug!(registry = %self.config.label, dependent = %id, "unsubscribed dependent");
    // Dropped only after the bookkeeping borrow is released.
    drop(dependent);
    Ok(())
  }

  pub(crate) fn is_subscribed(&self, id: DependentId) -> bool {
    self.with_graph(|graph| graph.is_subscribed(id))
  }

  /// Subscribes a plain object for the dependencies it declares.
  ///
  /// Each object can be subscribed once at a time; a second subscription
  /// fails with [`Error::AlreadySubscribed`].
  pub fn subscribe_object<T: DependentObject>(&self, object: Arc<T>) -> Result<DependentId> {
    let key = object_key(&object);
    let bridge = Arc::new(ObjectBridge::new(object)?);
    let _monitor = self.state.lock();
    let id = self.with_state(|state| match state.bridges.get(&key) {
      Some(existing) => Err(Error::AlreadySubscribed(*existing)),
      None => {
        let id = DependentId::next();
        state.bridges.insert(key, id);
        Ok(id)
      }
    })?;
    if let Err(err) = self.subscribe(id, bridge) {
      if !self.is_subscribed(id) {
        self.with_state(|state| state.bridges.remove(&key));
      }
      return Err(err);
    }
    Ok(id)
  }

  /// Unsubscribes a plain object previously passed to
  /// [`subscribe_object`](Self::subscribe_object).
  pub fn unsubscribe_object<T: DependentObject>(&self, object: &Arc<T>) -> Result<()> {
    let key = object_key(object);
    let _monitor = self.state.lock();
    let id = self
      .with_state(|state| state.bridges.remove(&key))
      .ok_or(Error::UnknownObject(std::any::type_name::<T>()))?;
    self.unsubscribe(id)
  }

  pub fn is_object_subscribed<T: DependentObject>(&self, object: &Arc<T>) -> bool {
    let key = object_key(object);
    self.with_state(|state| state.bridges.contains_key(&key))
  }

  // --- Components ---

  /// Wraps a freshly constructed component in its lifecycle. The component
  /// does nothing until the host calls
  /// [`initialize`](ComponentHandle::initialize).
  pub fn construct<T: Component>(self: &Arc<Self>, component: T) -> Result<ComponentHandle<T>> {
    ComponentHandle::new(self, component)
  }

  // --- Diagnostics ---

  pub fn stats(&self) -> RegistryStats {
    self.with_graph(|graph| RegistryStats {
      providers: graph.provider_count(),
      dependents: graph.dependent_count(),
      unresolved: graph.unresolved(),
    })
  }
}

impl fmt::Debug for Registry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let stats = self.stats();
    f.debug_struct("Registry")
      .field("label", &self.config.label)
      .field("providers", &stats.providers)
      .field("dependents", &stats.dependents)
      .finish()
  }
}

fn object_key<T>(object: &Arc<T>) -> usize {
  Arc::as_ptr(object) as *const () as usize
}
