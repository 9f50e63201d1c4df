use fibre_components::{Component, ComponentState, Dependency, Provider, Registry, UnloadReason};
use std::sync::Arc;

// --- Components ---
// Storage needs a database connection; Search needs Storage and can use a Cache.

struct Storage;
impl Component for Storage {
  const DEPENDENCIES: &'static [Dependency] = &[Dependency::required("Database")];

  fn on_fully_loaded(&self) {
    println!("[storage] online");
  }

  fn on_unloaded(&self, reason: UnloadReason) {
    println!("[storage] offline ({})", reason);
  }
}

struct Search;
impl Component for Search {
  const DEPENDENCIES: &'static [Dependency] = &[Dependency::required("Storage"), Dependency::optional("Cache")];

  fn on_dependency_loaded(&self, provider: &Provider) {
    println!("[search] got {}", provider.name());
  }

  fn on_dependency_unloaded(&self, provider: &Provider) {
    println!("[search] lost {}", provider.name());
  }

  fn on_fully_loaded(&self) {
    println!("[search] online");
  }

  fn on_unloaded(&self, reason: UnloadReason) {
    println!("[search] offline ({})", reason);
  }
}

fn main() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .try_init();

  let registry = Registry::new();

  // --- Wiring ---
  let storage = registry.construct(Storage).unwrap();
  storage.assign_instance_name("Storage").unwrap();
  storage.initialize().unwrap();

  let search = registry.construct(Search).unwrap();
  search.initialize().unwrap();
  println!("{}", search.describe_dependencies());

  let database = Provider::new("Database", Arc::new(String::from("postgres://localhost")));
  registry.register(database.clone()).unwrap();
  assert_eq!(storage.state(), ComponentState::Registered);
  assert!(search.is_fully_loaded());

  // --- Optional dependencies come and go freely ---
  let cache = Provider::new("Cache", Arc::new(()));
  registry.register(cache.clone()).unwrap();
  registry.unregister(&cache).unwrap();
  assert!(search.is_fully_loaded());

  // --- Losing the database takes the whole chain down ---
  registry.unregister(&database).unwrap();
  assert_eq!(storage.state(), ComponentState::Unloaded);
  assert_eq!(search.state(), ComponentState::Unloaded);

  let stats = registry.stats();
  println!("{:?}", stats);
  assert_eq!(stats.providers, 0);
  assert_eq!(stats.dependents, 0);
}
