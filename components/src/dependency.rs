//! Dependency declarations, the provider handle passed to dependents, and
//! injection slots.

use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Declares that a component needs the provider registered under `name`.
///
/// Declarations are constants attached to a type, so they are discovered once
/// and never change while the type is in use.
///
/// ```
/// use fibre_components::Dependency;
///
/// const DEPS: &[Dependency] = &[
///   Dependency::required("Logger").with_target("logger"),
///   Dependency::optional("Cache"),
/// ];
/// assert!(DEPS[0].is_required());
/// assert_eq!(DEPS[1].target(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
  name: &'static str,
  required: bool,
  target: Option<&'static str>,
}

impl Dependency {
  /// A dependency that gates "fully loaded" and triggers cascading unload.
  pub const fn required(name: &'static str) -> Self {
    Self {
      name,
      required: true,
      target: None,
    }
  }

  /// A dependency that only delivers notifications.
  pub const fn optional(name: &'static str) -> Self {
    Self {
      name,
      required: false,
      target: None,
    }
  }

  /// Names the slot the provider is injected into when it loads.
  pub const fn with_target(self, target: &'static str) -> Self {
    Self {
      target: Some(target),
      ..self
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn is_required(&self) -> bool {
    self.required
  }

  pub fn target(&self) -> Option<&'static str> {
    self.target
  }
}

/// Rejects declaration lists that can never be satisfied consistently.
pub(crate) fn validate_declarations(owner: &'static str, declarations: &[Dependency]) -> Result<()> {
  let mut seen = HashSet::new();
  for declaration in declarations {
    if declaration.name.is_empty() {
      return Err(Error::InvalidDeclaration {
        component: owner,
        reason: "dependency name must not be empty".to_string(),
      });
    }
    if declaration.target == Some("") {
      return Err(Error::InvalidDeclaration {
        component: owner,
        reason: format!("dependency '{}' has an empty target", declaration.name),
      });
    }
    if !seen.insert((declaration.name, declaration.target)) {
      return Err(Error::InvalidDeclaration {
        component: owner,
        reason: format!("duplicate declaration of dependency '{}'", declaration.name),
      });
    }
  }
  Ok(())
}

/// Distinct dependency names, in declaration order.
pub(crate) fn distinct_names(declarations: &[Dependency]) -> Vec<Arc<str>> {
  let mut names: Vec<Arc<str>> = Vec::with_capacity(declarations.len());
  for declaration in declarations {
    if !names.iter().any(|n| &**n == declaration.name) {
      names.push(Arc::from(declaration.name));
    }
  }
  names
}

/// A named instance that is, or was, available to dependents.
///
/// Cloning is cheap. The registry never owns the instance itself; it only
/// keeps this handle while the provider is registered.
#[derive(Clone)]
pub struct Provider {
  name: Arc<str>,
  type_name: &'static str,
  instance: Arc<dyn Any + Send + Sync>,
}

impl Provider {
  pub fn new<T: Any + Send + Sync>(name: impl Into<Arc<str>>, instance: Arc<T>) -> Self {
    Self {
      name: name.into(),
      type_name: type_name::<T>(),
      instance,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub(crate) fn shared_name(&self) -> &Arc<str> {
    &self.name
  }

  /// Type name of the concrete instance, for diagnostics.
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn is<T: Any + Send + Sync>(&self) -> bool {
    self.instance.is::<T>()
  }

  /// Returns the instance as `Arc<T>` if it has that concrete type.
  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.instance.clone().downcast::<T>().ok()
  }

  /// True if both handles point at the same instance.
  pub fn same_instance(&self, other: &Provider) -> bool {
    std::ptr::eq(
      Arc::as_ptr(&self.instance) as *const (),
      Arc::as_ptr(&other.instance) as *const (),
    )
  }
}

impl fmt::Debug for Provider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Provider")
      .field("name", &self.name)
      .field("type", &self.type_name)
      .finish()
  }
}

/// An injection target for a dependency.
///
/// Holds the provider's instance while it is loaded and nothing otherwise.
///
/// ```
/// use fibre_components::{Provider, Slot};
/// use std::sync::Arc;
///
/// let slot: Slot<String> = Slot::new();
/// let provider = Provider::new("Greeting", Arc::new(String::from("hi")));
///
/// slot.assign(Some(&provider));
/// assert_eq!(slot.get().as_deref().map(String::as_str), Some("hi"));
///
/// slot.assign(None);
/// assert!(slot.is_empty());
/// ```
pub struct Slot<T: ?Sized> {
  value: RwLock<Option<Arc<T>>>,
}

impl<T: Any + Send + Sync> Slot<T> {
  pub fn new() -> Self {
    Self {
      value: RwLock::new(None),
    }
  }

  /// Stores the provider's instance, or clears the slot when `provider` is
  /// `None`. Returns `false` if the provider is not a `T`, leaving the slot
  /// empty.
  pub fn assign(&self, provider: Option<&Provider>) -> bool {
    let next = provider.and_then(Provider::downcast::<T>);
    let matched = provider.is_none() || next.is_some();
    *self.value.write() = next;
    matched
  }

  pub fn get(&self) -> Option<Arc<T>> {
    self.value.read().clone()
  }

  pub fn is_empty(&self) -> bool {
    self.value.read().is_none()
  }
}

impl<T: Any + Send + Sync> Default for Slot<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Slot")
      .field("filled", &self.value.read().is_some())
      .finish()
  }
}
