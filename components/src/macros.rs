//! Public macros for looking up providers by name.

/// Looks up a provider in the global registry by name.
///
/// This is what a view binding uses to reach the public surface of a
/// component once it has been registered. It panics if the global registry
/// is not initialized, if nothing is registered under the name, or if the
/// provider has a different type. For a non-panicking version, use
/// `global::registry()?.get_as::<T>(name)` directly.
///
/// # Panics
///
/// See above.
///
/// # Examples
///
/// ```
/// use fibre_components::{global, lookup, Provider, RegistryConfig};
/// use std::sync::Arc;
///
/// let registry = global::init(RegistryConfig::default()).unwrap();
/// registry.register(Provider::new("Title", Arc::new(String::from("Main")))).unwrap();
///
/// let title = lookup!(String, "Title");
/// assert_eq!(*title, "Main");
///
/// // Untyped provider handle.
/// let provider = lookup!("Title");
/// assert_eq!(provider.name(), "Title");
/// # global::shutdown().unwrap();
/// ```
#[macro_export]
macro_rules! lookup {
  // Arm for a typed provider: lookup!(MyComponent, "name")
  ($type:ty, $name:expr) => {
    $crate::lookup!($name).downcast::<$type>().unwrap_or_else(|| {
      panic!(
        "Provider '{}' is not a {}",
        $name,
        std::any::type_name::<$type>()
      )
    })
  };

  // Arm for an untyped provider: lookup!("name")
  ($name:expr) => {
    $crate::global::registry()
      .and_then(|registry| registry.lookup($name))
      .unwrap_or_else(|err| panic!("Failed to look up provider '{}': {}", $name, err))
  };
}

/// Declares a dependency list.
///
/// ```
/// use fibre_components::{dependencies, Dependency};
///
/// const DEPS: &[Dependency] = dependencies![
///   required "Logger" => "logger",
///   optional "Cache",
/// ];
/// assert_eq!(DEPS.len(), 2);
/// assert_eq!(DEPS[0].target(), Some("logger"));
/// assert!(!DEPS[1].is_required());
/// ```
#[macro_export]
macro_rules! dependencies {
  ($($kind:ident $name:literal $(=> $target:literal)?),* $(,)?) => {
    &[$($crate::dependencies!(@one $kind $name $(=> $target)?)),*]
  };
  (@one required $name:literal) => {
    $crate::Dependency::required($name)
  };
  (@one optional $name:literal) => {
    $crate::Dependency::optional($name)
  };
  (@one $kind:ident $name:literal => $target:literal) => {
    $crate::dependencies!(@one $kind $name).with_target($target)
  };
}
