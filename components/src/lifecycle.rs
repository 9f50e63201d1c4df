//! Component lifecycle: dependency tracking, fully-loaded notification,
//! self-registration under an instance name, and cascading unload.

use crate::config::PrematureUnloadPolicy;
use crate::dependency::{distinct_names, validate_declarations, Dependency, Provider};
use crate::error::{Error, Result};
use crate::graph::{Dependent, DependentId};
use crate::registry::Registry;
use crate::tracker::{DependencyStatus, DependencyTracker};
use parking_lot::Mutex;
use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Weak};

/// Why a component was unloaded. Informational only; teardown behaves the
/// same for every reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnloadReason {
  /// The host closed the window or control owning the component.
  HostClosed,
  /// Someone called [`ComponentHandle::unload`].
  ManualRequest,
  /// A required dependency went away while the component was fully loaded.
  RequiredDependencyUnloaded,
}

impl fmt::Display for UnloadReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      UnloadReason::HostClosed => write!(f, "closed by host"),
      UnloadReason::ManualRequest => write!(f, "manually unloaded"),
      UnloadReason::RequiredDependencyUnloaded => write!(f, "required dependency unloaded"),
    }
  }
}

/// Where a component is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentState {
  Constructed,
  AwaitingDependencies,
  FullyLoaded,
  /// Fully loaded and registered as a provider under its instance name.
  Registered,
  Unloaded,
}

/// A unit of application logic managed by a [`Registry`].
///
/// Every hook runs synchronously on the thread that triggered it, inside the
/// registry's lock. Hooks may call back into the registry.
pub trait Component: Send + Sync + 'static {
  /// The providers this component depends on.
  const DEPENDENCIES: &'static [Dependency] = &[];

  /// Called once per provider load, before the statuses are updated.
  ///
  /// Unregistering `provider` itself from inside this hook is not supported:
  /// the unload arrives before the load has been recorded, and that
  /// `unregister` call fails with [`Error::Inconsistent`]. The provider is
  /// still removed, but this component keeps counting it as loaded.
  fn on_dependency_loaded(&self, provider: &Provider) {
    let _ = provider;
  }

  /// Called once per provider unload, before the statuses are updated.
  fn on_dependency_unloaded(&self, provider: &Provider) {
    let _ = provider;
  }

  /// Receives the provider for every declaration with a target, and `None`
  /// when it unloads. See [`Slot`](crate::Slot).
  fn inject(&self, target: &'static str, provider: Option<&Provider>) {
    let _ = (target, provider);
  }

  /// All required dependencies are loaded.
  fn on_fully_loaded(&self) {}

  /// Final notification; the component is no longer subscribed or registered.
  fn on_unloaded(&self, reason: UnloadReason) {
    let _ = reason;
  }
}

struct LifecycleState {
  state: ComponentState,
  tracker: DependencyTracker,
  instance_name: Option<Arc<str>>,
  registration: Option<Provider>,
  subscribed: bool,
}

struct Lifecycle<T: Component> {
  id: DependentId,
  registry: Weak<Registry>,
  component: Arc<T>,
  state: Mutex<LifecycleState>,
}

impl<T: Component> Lifecycle<T> {
  fn registry(&self) -> Result<Arc<Registry>> {
    self.registry.upgrade().ok_or(Error::RegistryClosed)
  }

  /// `AwaitingDependencies → FullyLoaded`, then registration if named.
  fn promote(&self, registry: &Registry) -> Result<()> {
    {
      let mut state = self.state.lock();
      if state.state != ComponentState::AwaitingDependencies || !state.tracker.is_fully_loaded() {
        return Ok(());
      }
      state.state = ComponentState::FullyLoaded;
    }
    tracing::trace!(
      registry = %registry.config().label,
      component = %type_name::<T>(),
      "all required dependencies are loaded"
    );
    self.component.on_fully_loaded();
    self.register_if_needed(registry)
  }

  /// Registers the component once it is fully loaded and has a name. Reached
  /// from both the fully-loaded transition and name assignment.
  fn register_if_needed(&self, registry: &Registry) -> Result<()> {
    let provider = {
      let mut state = self.state.lock();
      if state.state != ComponentState::FullyLoaded || state.registration.is_some() {
        return Ok(());
      }
      let Some(name) = state.instance_name.clone() else {
        return Ok(());
      };
      let provider = Provider::new(name, self.component.clone());
      state.registration = Some(provider.clone());
      state.state = ComponentState::Registered;
      provider
    };
    tracing::trace!(
      registry = %registry.config().label,
      component = %type_name::<T>(),
      name = %provider.name(),
      "registering as available for dependents"
    );

    let outcome = registry.register(provider.clone());
    if outcome.is_err() && !registry.is_current(&provider) {
      let mut state = self.state.lock();
      if state.registration.as_ref().is_some_and(|p| p.same_instance(&provider)) {
        state.registration = None;
        if state.state == ComponentState::Registered {
          state.state = ComponentState::FullyLoaded;
        }
      }
    }
    outcome
  }

  /// Any state `→ Unloaded`. Unloading twice is a no-op.
  fn unload(&self, registry: &Registry, reason: UnloadReason) -> Result<()> {
    let (previous, subscribed, registration) = {
      let mut state = self.state.lock();
      if state.state == ComponentState::Unloaded {
        tracing::debug!(
          registry = %registry.config().label,
          component = %type_name::<T>(),
          reason = ?reason,
          "component is already unloaded"
        );
        return Ok(());
      }
      let previous = std::mem::replace(&mut state.state, ComponentState::Unloaded);
      let subscribed = std::mem::take(&mut state.subscribed);
      (previous, subscribed, state.registration.take())
    };

    let fully_loaded = matches!(previous, ComponentState::FullyLoaded | ComponentState::Registered);
    if !fully_loaded {
      self.report_premature_unload(registry, previous, reason);
    }
    tracing::debug!(
      registry = %registry.config().label,
      component = %type_name::<T>(),
      name = ?registration.as_ref().map(Provider::name),
      reason = ?reason,
      "unloading component"
    );

    let unsubscribed = if subscribed {
      registry.unsubscribe(self.id)
    } else {
      Ok(())
    };
    let unregistered = match &registration {
      Some(provider) => registry.unregister(provider),
      None => Ok(()),
    };
    self.component.on_unloaded(reason);
    unsubscribed.and(unregistered)
  }

  fn report_premature_unload(&self, registry: &Registry, previous: ComponentState, reason: UnloadReason) {
    const MESSAGE: &str =
      "unloading a component that is not fully loaded yet; this usually means teardown ran in the wrong order";
    match registry.config().premature_unload {
      PrematureUnloadPolicy::Ignore => {}
      PrematureUnloadPolicy::Warn => tracing::warn!(
        registry = %registry.config().label,
        component = %type_name::<T>(),
        state = ?previous,
        reason = ?reason,
        "{}",
        MESSAGE
      ),
      PrematureUnloadPolicy::Panic => panic!("{} ({}, {:?})", MESSAGE, type_name::<T>(), previous),
    }
  }
}

impl<T: Component> Dependent for Lifecycle<T> {
  fn dependency_names(&self) -> Vec<Arc<str>> {
    distinct_names(T::DEPENDENCIES)
  }

  fn dependency_loaded(&self, provider: &Provider) -> Result<()> {
    let targets = {
      let state = self.state.lock();
      if state.state == ComponentState::Unloaded {
        return Ok(());
      }
      state.tracker.check_can_load(provider.name())?;
      state.tracker.targets(provider.name())
    };

    self.component.on_dependency_loaded(provider);
    for target in targets {
      self.component.inject(target, Some(provider));
    }

    let loaded = {
      let mut state = self.state.lock();
      if state.state == ComponentState::Unloaded {
        return Ok(());
      }
      let loaded = state.tracker.mark_loaded(provider.name());
      tracing::trace!(
        component = %type_name::<T>(),
        loaded = %provider.name(),
        "dependencies changed: {}",
        state.tracker
      );
      loaded
    };

    if loaded.became_fully_loaded {
      let registry = self.registry()?;
      // A taken instance name goes to the host through `initialize` or
      // `assign_instance_name`, never to whoever registered the provider.
      match self.promote(&registry) {
        Err(Error::DuplicateName(name)) => tracing::warn!(
          registry = %registry.config().label,
          component = %type_name::<T>(),
          name = %name,
          "instance name is already taken; staying unregistered"
        ),
        other => other?,
      }
    }
    Ok(())
  }

  fn dependency_unloaded(&self, provider: &Provider) -> Result<()> {
    let targets = {
      let state = self.state.lock();
      if state.state == ComponentState::Unloaded {
        return Ok(());
      }
      state.tracker.check_can_unload(provider.name())?;
      state.tracker.targets(provider.name())
    };

    self.component.on_dependency_unloaded(provider);
    for target in targets {
      self.component.inject(target, None);
    }

    let unloaded = {
      let mut state = self.state.lock();
      if state.state == ComponentState::Unloaded {
        return Ok(());
      }
      let unloaded = state.tracker.mark_unloaded(provider.name());
      tracing::trace!(
        component = %type_name::<T>(),
        unloaded = %provider.name(),
        required = unloaded.required,
        "dependencies changed: {}",
        state.tracker
      );
      unloaded
    };

    if unloaded.lost_fully_loaded {
      let registry = self.registry()?;
      self.unload(&registry, UnloadReason::RequiredDependencyUnloaded)?;
    }
    Ok(())
  }
}

/// The host's handle to a constructed component.
///
/// Cloning the handle does not clone the component.
///
/// ```
/// use fibre_components::{Component, ComponentState, Dependency, Provider, Registry};
/// use std::sync::Arc;
///
/// struct Editor;
/// impl Component for Editor {
///   const DEPENDENCIES: &'static [Dependency] = &[Dependency::required("Logger")];
/// }
///
/// let registry = Registry::new();
/// let editor = registry.construct(Editor).unwrap();
/// editor.initialize().unwrap();
/// assert_eq!(editor.state(), ComponentState::AwaitingDependencies);
///
/// registry.register(Provider::new("Logger", Arc::new(()))).unwrap();
/// assert_eq!(editor.state(), ComponentState::FullyLoaded);
/// ```
pub struct ComponentHandle<T: Component> {
  inner: Arc<Lifecycle<T>>,
}

impl<T: Component> Clone for ComponentHandle<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<T: Component> ComponentHandle<T> {
  pub(crate) fn new(registry: &Arc<Registry>, component: T) -> Result<Self> {
    validate_declarations(type_name::<T>(), T::DEPENDENCIES)?;
    let inner = Lifecycle {
      id: DependentId::next(),
      registry: Arc::downgrade(registry),
      component: Arc::new(component),
      state: Mutex::new(LifecycleState {
        state: ComponentState::Constructed,
        tracker: DependencyTracker::new(type_name::<T>(), T::DEPENDENCIES),
        instance_name: None,
        registration: None,
        subscribed: false,
      }),
    };
    Ok(Self { inner: Arc::new(inner) })
  }

  /// One-shot initialization by the host. Subscribes for the declared
  /// dependencies, replaying the ones already registered, and completes
  /// loading right away when nothing required is missing.
  ///
  /// Fails with [`Error::DuplicateName`] if the component became fully
  /// loaded but its instance name is taken; it then stays `FullyLoaded`.
  pub fn initialize(&self) -> Result<()> {
    let registry = self.inner.registry()?;
    registry.exclusive(|| {
      let has_dependencies = {
        let mut state = self.inner.state.lock();
        if state.state != ComponentState::Constructed {
          return Err(Error::AlreadyInitialized(type_name::<T>()));
        }
        state.state = ComponentState::AwaitingDependencies;
        state.subscribed = state.tracker.has_dependencies();
        tracing::trace!(
          registry = %registry.config().label,
          component = %type_name::<T>(),
          "component has {}",
          state.tracker
        );
        state.subscribed
      };

      if has_dependencies {
        let dependent: Arc<dyn Dependent> = self.inner.clone();
        if let Err(err) = registry.subscribe(self.inner.id, dependent) {
          if !registry.is_subscribed(self.inner.id) {
            self.inner.state.lock().subscribed = false;
          }
          return Err(err);
        }
      }
      self.inner.promote(&registry)?;
      // Reports a name collision hit while replaying existing providers.
      self.inner.register_if_needed(&registry)
    })
  }

  /// Sets the name the component registers under once fully loaded. The
  /// name can be assigned at most once, before or after loading completes.
  pub fn assign_instance_name(&self, name: impl Into<Arc<str>>) -> Result<()> {
    let name: Arc<str> = name.into();
    if name.is_empty() {
      return Err(Error::EmptyName);
    }
    let registry = self.inner.registry()?;
    registry.exclusive(|| {
      {
        let mut state = self.inner.state.lock();
        if let Some(current) = &state.instance_name {
          return Err(Error::InstanceNameAlreadySet {
            current: current.to_string(),
            requested: name.to_string(),
          });
        }
        state.instance_name = Some(name);
      }
      self.inner.register_if_needed(&registry)
    })
  }

  /// Unloads the component: unsubscribes it, unregisters it if it was
  /// registered, then calls [`Component::on_unloaded`].
  pub fn teardown(&self, reason: UnloadReason) -> Result<()> {
    let registry = self.inner.registry()?;
    registry.exclusive(|| self.inner.unload(&registry, reason))
  }

  /// The host closed the component.
  pub fn close(&self) -> Result<()> {
    self.teardown(UnloadReason::HostClosed)
  }

  /// Manual unload requested by application code.
  pub fn unload(&self) -> Result<()> {
    self.teardown(UnloadReason::ManualRequest)
  }

  pub fn id(&self) -> DependentId {
    self.inner.id
  }

  pub fn component(&self) -> &Arc<T> {
    &self.inner.component
  }

  pub fn state(&self) -> ComponentState {
    self.inner.state.lock().state
  }

  pub fn is_fully_loaded(&self) -> bool {
    matches!(self.state(), ComponentState::FullyLoaded | ComponentState::Registered)
  }

  pub fn is_registered(&self) -> bool {
    self.state() == ComponentState::Registered
  }

  pub fn instance_name(&self) -> Option<String> {
    self.inner.state.lock().instance_name.as_deref().map(str::to_string)
  }

  pub fn dependency_statuses(&self) -> Vec<DependencyStatus> {
    self.inner.state.lock().tracker.statuses().to_vec()
  }

  /// e.g. `2 dependencies: Logger (loaded), Cache (waiting)`
  pub fn describe_dependencies(&self) -> String {
    self.inner.state.lock().tracker.to_string()
  }
}

impl<T: Component> fmt::Debug for ComponentHandle<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.inner.state.lock();
    f.debug_struct("ComponentHandle")
      .field("component", &type_name::<T>())
      .field("id", &self.inner.id)
      .field("state", &state.state)
      .field("instance_name", &state.instance_name)
      .finish()
  }
}
