//! Bookkeeping for providers and the dependents waiting on them.
//!
//! Nothing in here invokes callbacks. The registry asks the graph what to
//! notify, releases its borrow, and then delivers.

use crate::dependency::Provider;
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_DEPENDENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a subscribed dependent.
///
/// Ids grow monotonically, so ordering by id is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependentId(u64);

impl DependentId {
  pub(crate) fn next() -> Self {
    Self(NEXT_DEPENDENT_ID.fetch_add(1, Ordering::Relaxed))
  }
}

impl fmt::Display for DependentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// The single internal contract every dependent is driven through.
pub(crate) trait Dependent: Send + Sync {
  /// Distinct names this dependent waits on, in declaration order.
  fn dependency_names(&self) -> Vec<Arc<str>>;

  fn dependency_loaded(&self, provider: &Provider) -> Result<()>;

  fn dependency_unloaded(&self, provider: &Provider) -> Result<()>;
}

struct ProviderEntry {
  provider: Provider,
  epoch: u64,
  // Dependents that received this registration's load callback.
  notified: BTreeSet<DependentId>,
  retiring: bool,
}

struct Subscription {
  dependent: Arc<dyn Dependent>,
  names: Vec<Arc<str>>,
}

pub(crate) type Delivery = (DependentId, Arc<dyn Dependent>);

#[derive(Default)]
pub(crate) struct DependencyGraph {
  providers: HashMap<Arc<str>, ProviderEntry>,
  waiters: HashMap<Arc<str>, BTreeSet<DependentId>>,
  pending: HashMap<DependentId, Subscription>,
  next_epoch: u64,
}

impl DependencyGraph {
  // --- Providers ---

  /// Stores `provider` under its name and returns the epoch of this
  /// registration.
  pub(crate) fn insert_provider(&mut self, provider: Provider) -> Result<u64> {
    if provider.name().is_empty() {
      return Err(Error::EmptyName);
    }
    if self.providers.contains_key(provider.name()) {
      return Err(Error::DuplicateName(provider.name().to_string()));
    }
    self.next_epoch += 1;
    let epoch = self.next_epoch;
    self.providers.insert(
      provider.shared_name().clone(),
      ProviderEntry {
        provider,
        epoch,
        notified: BTreeSet::new(),
        retiring: false,
      },
    );
    Ok(epoch)
  }

  /// Marks the registration held by `provider` as being torn down. A retiring
  /// provider is still visible to lookups but no longer replays to new
  /// subscribers and cannot be retired a second time.
  pub(crate) fn retire_provider(&mut self, provider: &Provider) -> Result<u64> {
    match self.providers.get_mut(provider.name()) {
      Some(entry) if !entry.retiring && entry.provider.same_instance(provider) => {
        entry.retiring = true;
        Ok(entry.epoch)
      }
      _ => Err(Error::UnknownProvider(provider.name().to_string())),
    }
  }

  pub(crate) fn remove_provider(&mut self, name: &str, epoch: u64) {
    if self.providers.get(name).is_some_and(|e| e.epoch == epoch) {
      self.providers.remove(name);
    }
  }

  pub(crate) fn provider(&self, name: &str) -> Option<&Provider> {
    self.providers.get(name).map(|entry| &entry.provider)
  }

  pub(crate) fn is_current(&self, provider: &Provider) -> bool {
    self
      .providers
      .get(provider.name())
      .is_some_and(|entry| entry.provider.same_instance(provider))
  }

  /// Snapshot of everyone currently waiting on `name`.
  pub(crate) fn waiters_of(&self, name: &str) -> Vec<Delivery> {
    self.deliveries(self.waiters.get(name).into_iter().flatten())
  }

  /// Snapshot of everyone that received the load callback of registration
  /// `epoch` of `name`.
  pub(crate) fn notified_of(&self, name: &str, epoch: u64) -> Vec<Delivery> {
    match self.providers.get(name) {
      Some(entry) if entry.epoch == epoch => self.deliveries(entry.notified.iter()),
      _ => Vec::new(),
    }
  }

  fn deliveries<'a>(&self, ids: impl Iterator<Item = &'a DependentId>) -> Vec<Delivery> {
    ids
      .filter_map(|id| self.pending.get(id).map(|s| (*id, s.dependent.clone())))
      .collect()
  }

  /// Claims the load callback of `name` for dependent `id`.
  ///
  /// Returns the provider to deliver, or `None` when the provider is gone,
  /// retiring, belongs to a different registration than `epoch`, the
  /// dependent no longer waits on `name`, or it was already notified.
  pub(crate) fn claim_load(&mut self, name: &str, epoch: Option<u64>, id: DependentId) -> Option<Provider> {
    if !self.waiters.get(name).is_some_and(|set| set.contains(&id)) {
      return None;
    }
    let entry = self.providers.get_mut(name)?;
    if entry.retiring || epoch.is_some_and(|e| e != entry.epoch) {
      return None;
    }
    entry.notified.insert(id).then(|| entry.provider.clone())
  }

  /// Claims the unload callback of registration `epoch` of `name` for `id`.
  pub(crate) fn claim_unload(&mut self, name: &str, epoch: u64, id: DependentId) -> bool {
    match self.providers.get_mut(name) {
      Some(entry) if entry.epoch == epoch => entry.notified.remove(&id),
      _ => false,
    }
  }

  // --- Dependents ---

  /// Records `dependent` as waiting on every one of `names`.
  pub(crate) fn insert_subscription(
    &mut self,
    id: DependentId,
    dependent: Arc<dyn Dependent>,
    names: Vec<Arc<str>>,
  ) -> Result<()> {
    if self.pending.contains_key(&id) {
      return Err(Error::AlreadySubscribed(id));
    }
    for name in &names {
      self.waiters.entry(name.clone()).or_default().insert(id);
    }
    self.pending.insert(id, Subscription { dependent, names });
    Ok(())
  }

  /// Forgets `id` everywhere and hands the dependent back so the caller can
  /// drop it outside any borrow of the graph.
  pub(crate) fn remove_subscription(&mut self, id: DependentId) -> Result<Arc<dyn Dependent>> {
    let subscription = self.pending.remove(&id).ok_or(Error::NotSubscribed(id))?;
    for name in &subscription.names {
      if let Some(set) = self.waiters.get_mut(name) {
        set.remove(&id);
        if set.is_empty() {
          self.waiters.remove(name);
        }
      }
      if let Some(entry) = self.providers.get_mut(name) {
        entry.notified.remove(&id);
      }
    }
    Ok(subscription.dependent)
  }

  pub(crate) fn is_subscribed(&self, id: DependentId) -> bool {
    self.pending.contains_key(&id)
  }

  // --- Diagnostics ---

  pub(crate) fn provider_count(&self) -> usize {
    self.providers.len()
  }

  pub(crate) fn dependent_count(&self) -> usize {
    self.pending.len()
  }

  /// Names that somebody waits on but nobody provides, sorted.
  pub(crate) fn unresolved(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .waiters
      .keys()
      .filter(|name| !self.providers.contains_key(*name))
      .map(|name| name.to_string())
      .collect();
    names.sort();
    names
  }
}
