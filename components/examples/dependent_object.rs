use fibre_components::{dependencies, Dependency, DependentObject, Provider, Registry, Slot};
use std::sync::Arc;

// --- A plain object, not a component ---
// It never unloads itself; it just shows whatever is currently available.

#[derive(Default)]
struct StatusBar {
  user: Slot<String>,
  clock: Slot<u64>,
}

impl StatusBar {
  fn line(&self) -> String {
    let user = self.user.get().map(|u| u.to_string()).unwrap_or_else(|| "-".to_string());
    let clock = self.clock.get().map(|c| c.to_string()).unwrap_or_else(|| "--:--".to_string());
    format!("user: {} | time: {}", user, clock)
  }
}

impl DependentObject for StatusBar {
  const DEPENDENCIES: &'static [Dependency] = dependencies![
    optional "Session" => "user",
    optional "Clock" => "clock",
  ];

  fn dependency_loaded(&self, provider: &Provider) {
    println!("status bar: {} available", provider.name());
  }

  fn dependency_unloaded(&self, provider: &Provider) {
    println!("status bar: {} gone", provider.name());
  }

  fn inject(&self, target: &'static str, provider: Option<&Provider>) {
    match target {
      "user" => {
        self.user.assign(provider);
      }
      "clock" => {
        self.clock.assign(provider);
      }
      _ => {}
    }
  }
}

fn main() {
  let registry = Registry::new();
  let bar = Arc::new(StatusBar::default());
  registry.subscribe_object(bar.clone()).unwrap();
  println!("{}", bar.line());

  let session = Provider::new("Session", Arc::new(String::from("ada")));
  registry.register(session.clone()).unwrap();
  registry.register(Provider::new("Clock", Arc::new(1200u64))).unwrap();
  println!("{}", bar.line());
  assert_eq!(bar.line(), "user: ada | time: 1200");

  registry.unregister(&session).unwrap();
  println!("{}", bar.line());
  assert_eq!(bar.line(), "user: - | time: 1200");

  registry.unsubscribe_object(&bar).unwrap();
}
