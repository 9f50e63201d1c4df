//! Plain objects that only want load/unload callbacks, without a lifecycle.

use crate::dependency::{distinct_names, validate_declarations, Dependency, Provider};
use crate::error::Result;
use crate::graph::Dependent;
use crate::tracker::DependencyTracker;
use parking_lot::Mutex;
use std::any::type_name;
use std::sync::Arc;

/// Contract for objects that are not components but still need to hear about
/// providers coming and going. Subscribe one with
/// [`Registry::subscribe_object`](crate::Registry::subscribe_object).
///
/// ```
/// use fibre_components::{Dependency, DependentObject, Provider, Registry, Slot};
/// use std::sync::Arc;
///
/// struct StatusBar {
///   clock: Slot<u64>,
/// }
///
/// impl DependentObject for StatusBar {
///   const DEPENDENCIES: &'static [Dependency] = &[Dependency::optional("Clock").with_target("clock")];
///
///   fn dependency_loaded(&self, _provider: &Provider) {}
///   fn dependency_unloaded(&self, _provider: &Provider) {}
///
///   fn inject(&self, target: &'static str, provider: Option<&Provider>) {
///     if target == "clock" {
///       self.clock.assign(provider);
///     }
///   }
/// }
///
/// let registry = Registry::new();
/// let bar = Arc::new(StatusBar { clock: Slot::new() });
/// registry.subscribe_object(bar.clone()).unwrap();
///
/// registry.register(Provider::new("Clock", Arc::new(42u64))).unwrap();
/// assert_eq!(bar.clock.get().map(|c| *c), Some(42));
/// ```
pub trait DependentObject: Send + Sync + 'static {
  const DEPENDENCIES: &'static [Dependency];

  /// Unregistering `provider` itself from here fails with
  /// [`Error::Inconsistent`](crate::Error::Inconsistent), as it does for
  /// [`Component::on_dependency_loaded`](crate::Component::on_dependency_loaded).
  fn dependency_loaded(&self, provider: &Provider);

  fn dependency_unloaded(&self, provider: &Provider);

  /// Receives the provider for every declaration with a target after
  /// [`dependency_loaded`](Self::dependency_loaded), and `None` after
  /// [`dependency_unloaded`](Self::dependency_unloaded).
  fn inject(&self, target: &'static str, provider: Option<&Provider>) {
    let _ = (target, provider);
  }
}

/// Drives a [`DependentObject`] through the internal dependent contract.
pub(crate) struct ObjectBridge<T: DependentObject> {
  object: Arc<T>,
  tracker: Mutex<DependencyTracker>,
}

impl<T: DependentObject> ObjectBridge<T> {
  pub(crate) fn new(object: Arc<T>) -> Result<Self> {
    validate_declarations(type_name::<T>(), T::DEPENDENCIES)?;
    Ok(Self {
      object,
      tracker: Mutex::new(DependencyTracker::new(type_name::<T>(), T::DEPENDENCIES)),
    })
  }
}

impl<T: DependentObject> Dependent for ObjectBridge<T> {
  fn dependency_names(&self) -> Vec<Arc<str>> {
    distinct_names(T::DEPENDENCIES)
  }

  fn dependency_loaded(&self, provider: &Provider) -> Result<()> {
    let targets = {
      let tracker = self.tracker.lock();
      tracker.check_can_load(provider.name())?;
      tracker.targets(provider.name())
    };
    self.object.dependency_loaded(provider);
    for target in targets {
      self.object.inject(target, Some(provider));
    }
    self.tracker.lock().mark_loaded(provider.name());
    Ok(())
  }

  fn dependency_unloaded(&self, provider: &Provider) -> Result<()> {
    let targets = {
      let tracker = self.tracker.lock();
      tracker.check_can_unload(provider.name())?;
      tracker.targets(provider.name())
    };
    self.object.dependency_unloaded(provider);
    for target in targets {
      self.object.inject(target, None);
    }
    self.tracker.lock().mark_unloaded(provider.name());
    Ok(())
  }
}
