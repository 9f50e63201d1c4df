//! The process-wide registry and its explicit init/shutdown lifecycle.

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::registry::Registry;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

// Empty until `init` runs, and again after `shutdown`.
static GLOBAL_REGISTRY: Lazy<RwLock<Option<Arc<Registry>>>> = Lazy::new(|| RwLock::new(None));

/// Creates the process-wide registry.
///
/// Components are still handed the registry explicitly; the global slot only
/// exists for code that has no other way to reach it, such as view bindings
/// resolving providers by name.
///
/// # Examples
///
/// ```
/// use fibre_components::{global, RegistryConfig};
///
/// let registry = global::init(RegistryConfig::default()).unwrap();
/// assert!(global::init(RegistryConfig::default()).is_err());
///
/// assert!(std::sync::Arc::ptr_eq(&registry, &global::registry().unwrap()));
/// global::shutdown().unwrap();
/// ```
pub fn init(config: RegistryConfig) -> Result<Arc<Registry>> {
  let mut slot = GLOBAL_REGISTRY.write();
  if slot.is_some() {
    return Err(Error::GlobalAlreadyInitialized);
  }
  let registry = Registry::with_config(config);
  tracing::debug!(registry = %registry.config().label, "initialized global registry");
  *slot = Some(registry.clone());
  Ok(registry)
}

/// The process-wide registry, if [`init`] has been called.
pub fn registry() -> Result<Arc<Registry>> {
  GLOBAL_REGISTRY
    .read()
    .clone()
    .ok_or(Error::GlobalNotInitialized)
}

/// Releases the process-wide registry.
///
/// Components created against it keep working for as long as somebody else
/// holds the registry; once the last reference goes, their operations fail
/// with [`Error::RegistryClosed`].
pub fn shutdown() -> Result<()> {
  let registry = GLOBAL_REGISTRY
    .write()
    .take()
    .ok_or(Error::GlobalNotInitialized)?;
  let stats = registry.stats();
  if stats.providers > 0 || stats.dependents > 0 {
    tracing::warn!(
      registry = %registry.config().label,
      providers = stats.providers,
      dependents = stats.dependents,
      unresolved = ?stats.unresolved,
      "global registry shut down while components are still attached"
    );
  } else {
    tracing::debug!(registry = %registry.config().label, "global registry shut down");
  }
  Ok(())
}
