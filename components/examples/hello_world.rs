use fibre_components::{global, lookup, Component, Dependency, Provider, RegistryConfig, Slot};
use std::sync::Arc;

// --- A provider and a component that needs it ---
struct Greeter {
  greeting: String,
}

#[derive(Default)]
struct Banner {
  greeter: Slot<Greeter>,
}

impl Banner {
  fn render(&self, who: &str) -> String {
    match self.greeter.get() {
      Some(greeter) => format!("{}, {}!", greeter.greeting, who),
      None => "(no greeter yet)".to_string(),
    }
  }
}

impl Component for Banner {
  const DEPENDENCIES: &'static [Dependency] = &[Dependency::required("Greeter").with_target("greeter")];

  fn inject(&self, target: &'static str, provider: Option<&Provider>) {
    if target == "greeter" {
      self.greeter.assign(provider);
    }
  }

  fn on_fully_loaded(&self) {
    println!("Banner is ready.");
  }
}

fn main() {
  let registry = global::init(RegistryConfig::default().with_label("hello")).unwrap();

  // --- Construction ---
  // The banner can be built before its dependency exists.
  let banner = registry.construct(Banner::default()).unwrap();
  banner.assign_instance_name("Banner").unwrap();
  banner.initialize().unwrap();
  println!("{}", banner.component().render("world"));

  // --- Registration ---
  registry
    .register(Provider::new(
      "Greeter",
      Arc::new(Greeter {
        greeting: "Hello".to_string(),
      }),
    ))
    .unwrap();

  // --- Lookup ---
  // Anything holding the name can now reach the banner.
  let resolved = lookup!(Banner, "Banner");
  let text = resolved.render("world");
  println!("{}", text);
  assert_eq!(text, "Hello, world!");

  banner.close().unwrap();
  global::shutdown().unwrap();
}
