use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the `fibre_logfile` library.
#[derive(Debug, Error)]
pub enum Error {
  /// A format template referenced a placeholder outside the supported set.
  #[error("Unknown field '${name}' in template {template:?}")]
  UnknownField { name: String, template: String },

  #[error("Failed to create log directory {path:?}: {source}")]
  DirectoryCreate { path: PathBuf, source: io::Error },

  #[error("Failed to open log file {path:?}: {source}")]
  FileOpen { path: PathBuf, source: io::Error },

  #[error("Failed to stat log file {path:?}: {source}")]
  Stat { path: PathBuf, source: io::Error },

  #[error("Failed to write log file {path:?}: {source}")]
  Write { path: PathBuf, source: io::Error },

  #[error("Configuration file not found: {0}")]
  ConfigNotFound(String),

  #[error("Failed to read configuration file: {0}")]
  ConfigRead(#[from] io::Error),

  #[error("Failed to parse configuration: {0}")]
  ConfigParse(String),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidConfigValue { field: String, message: String },

  #[error("Failed to install log bridge: {0}")]
  LogBridgeInit(String),

  #[error("Failed to set global tracing subscriber: {0}")]
  GlobalSubscriberSet(String),
}

impl Error {
  /// True for the filesystem failures that only ever cost the current event.
  pub fn is_recoverable_io(&self) -> bool {
    matches!(
      self,
      Error::DirectoryCreate { .. }
        | Error::FileOpen { .. }
        | Error::Stat { .. }
        | Error::Write { .. }
    )
  }
}

/// A specialized `Result` type for `fibre_logfile` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
