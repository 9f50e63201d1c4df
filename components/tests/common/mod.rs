#![allow(dead_code)]

use fibre_components::{Component, Dependency, DependentObject, Provider, Slot, UnloadReason};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;

/// Installs a test-writer subscriber once. Set `RUST_LOG=fibre_components=trace`
/// to see the registry's transitions.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

/// Something a probe observed, tagged with the probe that observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  Loaded(&'static str, String),
  Unloaded(&'static str, String),
  FullyLoaded(&'static str),
  Gone(&'static str, UnloadReason),
}

/// Shared, ordered record of events across every probe in a test.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
  pub fn push(&self, event: Event) {
    self.0.lock().push(event);
  }

  pub fn events(&self) -> Vec<Event> {
    self.0.lock().clone()
  }

  /// Returns and clears everything recorded so far.
  pub fn take(&self) -> Vec<Event> {
    std::mem::take(&mut *self.0.lock())
  }

  pub fn count(&self, event: &Event) -> usize {
    self.0.lock().iter().filter(|e| *e == event).count()
  }
}

/// A dependency list, as a type.
pub trait Deps: Send + Sync + 'static {
  const LIST: &'static [Dependency];
}

/// A component that records every hook into a [`Journal`].
pub struct Probe<D> {
  pub tag: &'static str,
  pub journal: Journal,
  pub slot: Slot<String>,
  _deps: PhantomData<D>,
}

impl<D: Deps> Probe<D> {
  pub fn new(tag: &'static str, journal: &Journal) -> Self {
    Self {
      tag,
      journal: journal.clone(),
      slot: Slot::new(),
      _deps: PhantomData,
    }
  }
}

impl<D: Deps> Component for Probe<D> {
  const DEPENDENCIES: &'static [Dependency] = D::LIST;

  fn on_dependency_loaded(&self, provider: &Provider) {
    self.journal.push(Event::Loaded(self.tag, provider.name().to_string()));
  }

  fn on_dependency_unloaded(&self, provider: &Provider) {
    self.journal.push(Event::Unloaded(self.tag, provider.name().to_string()));
  }

  fn inject(&self, target: &'static str, provider: Option<&Provider>) {
    if target == "slot" {
      self.slot.assign(provider);
    }
  }

  fn on_fully_loaded(&self) {
    self.journal.push(Event::FullyLoaded(self.tag));
  }

  fn on_unloaded(&self, reason: UnloadReason) {
    self.journal.push(Event::Gone(self.tag, reason));
  }
}

/// A plain dependent object that records callbacks into a [`Journal`].
pub struct Watcher<D> {
  pub tag: &'static str,
  pub journal: Journal,
  pub slot: Slot<String>,
  _deps: PhantomData<D>,
}

impl<D: Deps> Watcher<D> {
  pub fn new(tag: &'static str, journal: &Journal) -> Arc<Self> {
    Arc::new(Self {
      tag,
      journal: journal.clone(),
      slot: Slot::new(),
      _deps: PhantomData,
    })
  }
}

impl<D: Deps> DependentObject for Watcher<D> {
  const DEPENDENCIES: &'static [Dependency] = D::LIST;

  fn dependency_loaded(&self, provider: &Provider) {
    self.journal.push(Event::Loaded(self.tag, provider.name().to_string()));
  }

  fn dependency_unloaded(&self, provider: &Provider) {
    self.journal.push(Event::Unloaded(self.tag, provider.name().to_string()));
  }

  fn inject(&self, target: &'static str, provider: Option<&Provider>) {
    if target == "slot" {
      self.slot.assign(provider);
    }
  }
}

// --- Dependency lists shared by the tests ---

pub struct NoDeps;
impl Deps for NoDeps {
  const LIST: &'static [Dependency] = &[];
}

pub struct LoggerAndCache;
impl Deps for LoggerAndCache {
  const LIST: &'static [Dependency] = &[Dependency::required("Logger"), Dependency::optional("Cache")];
}

pub struct NeedsA;
impl Deps for NeedsA {
  const LIST: &'static [Dependency] = &[Dependency::required("A")];
}

pub struct NeedsB;
impl Deps for NeedsB {
  const LIST: &'static [Dependency] = &[Dependency::required("B")];
}

pub struct NeedsAB;
impl Deps for NeedsAB {
  const LIST: &'static [Dependency] = &[Dependency::required("A"), Dependency::required("B")];
}

pub struct OptionalA;
impl Deps for OptionalA {
  const LIST: &'static [Dependency] = &[Dependency::optional("A")];
}

pub struct SlotForText;
impl Deps for SlotForText {
  const LIST: &'static [Dependency] = &[Dependency::required("Text").with_target("slot")];
}

pub fn text(name: &'static str, value: &str) -> Provider {
  Provider::new(name, Arc::new(value.to_string()))
}

pub fn unit(name: &'static str) -> Provider {
  Provider::new(name, Arc::new(()))
}
