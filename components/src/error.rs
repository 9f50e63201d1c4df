use thiserror::Error;

use crate::graph::DependentId;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A programmer mistake at the call site. Never retried by the registry.
  Usage,
  /// The registry's own bookkeeping disagrees with a notification it received.
  Assertion,
  /// Configuration could not be read or parsed.
  Config,
}

/// The main error type for the `fibre_components` library.
#[derive(Debug, Error)]
pub enum Error {
  #[error("provider name must not be empty")]
  EmptyName,

  #[error("a provider named '{0}' is already registered")]
  DuplicateName(String),

  #[error("no provider named '{0}' is registered")]
  UnknownProvider(String),

  #[error("no provider named '{0}' is available")]
  ProviderNotFound(String),

  #[error("dependent {0} is already subscribed for its dependencies")]
  AlreadySubscribed(DependentId),

  #[error("dependent {0} is not subscribed")]
  NotSubscribed(DependentId),

  #[error("object of type {0} is not subscribed for its dependencies")]
  UnknownObject(&'static str),

  #[error("instance name is already set to '{current}', cannot replace it with '{requested}'")]
  InstanceNameAlreadySet { current: String, requested: String },

  #[error("component {0} has already been initialized")]
  AlreadyInitialized(&'static str),

  #[error("invalid dependency declaration on {component}: {reason}")]
  InvalidDeclaration {
    component: &'static str,
    reason: String,
  },

  #[error("dependency bookkeeping of {dependent} is inconsistent: {message}")]
  Inconsistent {
    dependent: &'static str,
    message: String,
  },

  #[error("the registry this component belongs to has been shut down")]
  RegistryClosed,

  #[error("the global registry is already initialized")]
  GlobalAlreadyInitialized,

  #[error("the global registry is not initialized")]
  GlobalNotInitialized,

  #[error("Failed to read configuration file: {0}")]
  ConfigRead(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  ConfigParse(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::Inconsistent { .. } => ErrorKind::Assertion,
      Error::ConfigRead(_) | Error::ConfigParse(_) => ErrorKind::Config,
      _ => ErrorKind::Usage,
    }
  }

  pub(crate) fn inconsistent(dependent: &'static str, message: impl Into<String>) -> Self {
    Error::Inconsistent {
      dependent,
      message: message.into(),
    }
  }
}

/// A specialized `Result` type for `fibre_components` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
