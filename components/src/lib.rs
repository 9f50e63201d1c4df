//! # Fibre Components
//!
//! A synchronous, thread-safe registry that connects named runtime components
//! to the components waiting on them.
//!
//! Unlike a container that wires a static graph at startup, components here
//! come and go while the application runs. A component declares the names it
//! depends on; when a provider registers under one of those names every
//! dependent hears about it immediately, and when it goes away they hear
//! about that too. A component whose *required* dependency disappears is
//! unloaded in turn, within the same call.
//!
//! ## Core Concepts
//!
//! - **Registry**: the monitor holding providers and the dependents waiting on them.
//! - **Provider**: any instance registered under a unique, non-empty name.
//! - **Component**: a type with declared [`Dependency`] constants and lifecycle
//!   hooks, driven through a [`ComponentHandle`] by its host.
//! - **Dependent object**: a plain object that only wants load/unload callbacks
//!   (see [`DependentObject`]).
//!
//! ## Quick Start
//!
//! ```
//! use fibre_components::{Component, Dependency, Provider, Registry, UnloadReason};
//! use std::sync::{Arc, Mutex};
//!
//! struct Logger;
//!
//! #[derive(Default)]
//! struct Editor {
//!   events: Mutex<Vec<String>>,
//! }
//!
//! impl Component for Editor {
//!   const DEPENDENCIES: &'static [Dependency] = &[
//!     Dependency::required("Logger"),
//!     Dependency::optional("Cache"),
//!   ];
//!
//!   fn on_dependency_loaded(&self, provider: &Provider) {
//!     self.events.lock().unwrap().push(format!("loaded {}", provider.name()));
//!   }
//!
//!   fn on_fully_loaded(&self) {
//!     self.events.lock().unwrap().push("ready".to_string());
//!   }
//!
//!   fn on_unloaded(&self, reason: UnloadReason) {
//!     self.events.lock().unwrap().push(format!("unloaded: {}", reason));
//!   }
//! }
//!
//! let registry = Registry::new();
//! let logger = Provider::new("Logger", Arc::new(Logger));
//! registry.register(logger.clone()).unwrap();
//!
//! // The host constructs and initializes the component.
//! let editor = registry.construct(Editor::default()).unwrap();
//! editor.initialize().unwrap();
//! assert!(editor.is_fully_loaded());
//!
//! // Losing a required dependency unloads the editor.
//! registry.unregister(&logger).unwrap();
//! assert_eq!(
//!   *editor.component().events.lock().unwrap(),
//!   vec!["loaded Logger", "ready", "unloaded: required dependency unloaded"]
//! );
//! ```
//!
//! ## Circular dependencies
//!
//! Two components that each require the other never become fully loaded and
//! never register. The registry does not detect this; such names show up in
//! [`Registry::stats`] as unresolved.

mod bridge;
mod config;
mod dependency;
mod error;
pub mod global;
mod graph;
mod lifecycle;
mod macros;
mod registry;
mod tracker;

pub use bridge::DependentObject;
pub use config::{PrematureUnloadPolicy, RegistryConfig};
pub use dependency::{Dependency, Provider, Slot};
pub use error::{Error, ErrorKind, Result};
pub use graph::DependentId;
pub use lifecycle::{Component, ComponentHandle, ComponentState, UnloadReason};
pub use registry::{Registry, RegistryStats};
pub use tracker::DependencyStatus;
