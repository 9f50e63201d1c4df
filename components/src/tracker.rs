//! Per-dependent dependency status bookkeeping.

use crate::dependency::Dependency;
use crate::error::{Error, Result};
use std::fmt;

/// Loaded status of one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyStatus {
  pub declaration: Dependency,
  pub loaded: bool,
}

/// What a completed load changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Loaded {
  pub(crate) became_fully_loaded: bool,
}

/// What a completed unload changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Unloaded {
  pub(crate) required: bool,
  pub(crate) lost_fully_loaded: bool,
}

/// Statuses of every declaration on one dependent.
///
/// Several declarations may share a name; they are loaded and unloaded
/// together. The tracker only records state. Hooks are invoked by its owner
/// between [`check_can_load`](Self::check_can_load) and
/// [`mark_loaded`](Self::mark_loaded) (and likewise for unloads).
#[derive(Debug)]
pub(crate) struct DependencyTracker {
  owner: &'static str,
  statuses: Vec<DependencyStatus>,
  fully_loaded: bool,
}

impl DependencyTracker {
  /// Starts with every status unloaded. Without required declarations the
  /// dependent counts as fully loaded from the start.
  pub(crate) fn new(owner: &'static str, declarations: &[Dependency]) -> Self {
    let statuses: Vec<_> = declarations
      .iter()
      .map(|&declaration| DependencyStatus {
        declaration,
        loaded: false,
      })
      .collect();
    let fully_loaded = !statuses.iter().any(|s| s.declaration.is_required());
    Self {
      owner,
      statuses,
      fully_loaded,
    }
  }

  pub(crate) fn has_dependencies(&self) -> bool {
    !self.statuses.is_empty()
  }

  pub(crate) fn is_fully_loaded(&self) -> bool {
    self.fully_loaded
  }

  pub(crate) fn statuses(&self) -> &[DependencyStatus] {
    &self.statuses
  }

  fn matching<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DependencyStatus> + 'a {
    self.statuses.iter().filter(move |s| s.declaration.name() == name)
  }

  /// Targets declared for `name`, in declaration order.
  pub(crate) fn targets(&self, name: &str) -> Vec<&'static str> {
    self.matching(name).filter_map(|s| s.declaration.target()).collect()
  }

  pub(crate) fn check_can_load(&self, name: &str) -> Result<()> {
    if self.matching(name).next().is_none() {
      return Err(Error::inconsistent(
        self.owner,
        format!("received '{}', which it never declared", name),
      ));
    }
    if self.matching(name).any(|s| s.loaded) {
      return Err(Error::inconsistent(
        self.owner,
        format!("dependency '{}' reported loaded twice", name),
      ));
    }
    Ok(())
  }

  pub(crate) fn check_can_unload(&self, name: &str) -> Result<()> {
    if self.matching(name).next().is_none() {
      return Err(Error::inconsistent(
        self.owner,
        format!("received '{}', which it never declared", name),
      ));
    }
    if !self.matching(name).all(|s| s.loaded) {
      return Err(Error::inconsistent(
        self.owner,
        format!("dependency '{}' unloaded while not loaded", name),
      ));
    }
    Ok(())
  }

  pub(crate) fn mark_loaded(&mut self, name: &str) -> Loaded {
    for status in self.statuses.iter_mut().filter(|s| s.declaration.name() == name) {
      status.loaded = true;
    }
    let all_required = self
      .statuses
      .iter()
      .all(|s| !s.declaration.is_required() || s.loaded);
    let became_fully_loaded = all_required && !self.fully_loaded;
    if became_fully_loaded {
      self.fully_loaded = true;
    }
    Loaded { became_fully_loaded }
  }

  pub(crate) fn mark_unloaded(&mut self, name: &str) -> Unloaded {
    let mut required = false;
    for status in self.statuses.iter_mut().filter(|s| s.declaration.name() == name) {
      status.loaded = false;
      required |= status.declaration.is_required();
    }
    let lost_fully_loaded = required && self.fully_loaded;
    if lost_fully_loaded {
      self.fully_loaded = false;
    }
    Unloaded {
      required,
      lost_fully_loaded,
    }
  }
}

impl fmt::Display for DependencyTracker {
  /// e.g. `2 dependencies: Logger (loaded), Cache (waiting)`
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.statuses.is_empty() {
      return write!(f, "no dependencies");
    }
    write!(f, "{} dependencies: ", self.statuses.len())?;
    for (i, status) in self.statuses.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      let state = if status.loaded { "loaded" } else { "waiting" };
      write!(f, "{} ({})", status.declaration.name(), state)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  const DEPS: &[Dependency] = &[
    Dependency::required("A"),
    Dependency::required("B"),
    Dependency::optional("C"),
  ];

  #[test]
  fn test_fully_loaded_only_after_all_required() {
    let mut tracker = DependencyTracker::new("T", DEPS);
    assert!(!tracker.is_fully_loaded());

    assert!(!tracker.mark_loaded("A").became_fully_loaded);
    assert!(!tracker.mark_loaded("C").became_fully_loaded);
    assert!(tracker.mark_loaded("B").became_fully_loaded);
    assert!(tracker.is_fully_loaded());
  }

  #[test]
  fn test_no_required_dependencies_is_fully_loaded_from_start() {
    let tracker = DependencyTracker::new("T", &[Dependency::optional("C")]);
    assert!(tracker.is_fully_loaded());
    assert!(tracker.has_dependencies());
  }

  #[test]
  fn test_required_unload_resets_fully_loaded() {
    let mut tracker = DependencyTracker::new("T", DEPS);
    tracker.mark_loaded("A");
    tracker.mark_loaded("B");

    let optional = tracker.mark_unloaded("C");
    assert!(!optional.required);
    assert!(!optional.lost_fully_loaded);
    assert!(tracker.is_fully_loaded());

    let required = tracker.mark_unloaded("A");
    assert!(required.required);
    assert!(required.lost_fully_loaded);
    assert!(!tracker.is_fully_loaded());
  }

  #[test]
  fn test_required_unload_before_fully_loaded_does_not_cascade() {
    let mut tracker = DependencyTracker::new("T", DEPS);
    tracker.mark_loaded("A");
    let outcome = tracker.mark_unloaded("A");
    assert!(outcome.required);
    assert!(!outcome.lost_fully_loaded);
  }

  #[test]
  fn test_double_load_is_an_assertion_fault() {
    let mut tracker = DependencyTracker::new("T", DEPS);
    tracker.check_can_load("A").unwrap();
    tracker.mark_loaded("A");
    let err = tracker.check_can_load("A").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
  }

  #[test]
  fn test_unload_while_not_loaded_is_an_assertion_fault() {
    let tracker = DependencyTracker::new("T", DEPS);
    let err = tracker.check_can_unload("B").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
  }

  #[test]
  fn test_shared_name_statuses_move_together() {
    let deps = [
      Dependency::required("Logger").with_target("primary"),
      Dependency::optional("Logger").with_target("audit"),
    ];
    let mut tracker = DependencyTracker::new("T", &deps);
    assert_eq!(tracker.targets("Logger"), vec!["primary", "audit"]);

    assert!(tracker.mark_loaded("Logger").became_fully_loaded);
    assert!(tracker.statuses().iter().all(|s| s.loaded));

    let outcome = tracker.mark_unloaded("Logger");
    assert!(outcome.required);
    assert!(tracker.statuses().iter().all(|s| !s.loaded));
  }

  #[test]
  fn test_status_description() {
    let mut tracker = DependencyTracker::new("T", DEPS);
    tracker.mark_loaded("A");
    assert_eq!(
      tracker.to_string(),
      "3 dependencies: A (loaded), B (waiting), C (waiting)"
    );
    assert_eq!(DependencyTracker::new("T", &[]).to_string(), "no dependencies");
  }
}
