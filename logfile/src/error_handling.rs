use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fibre::{
  error::TrySendError as FibreTrySendError,
  mpsc::{self, BoundedReceiver as FibreMpscBoundedReceiver, BoundedSender as FibreMpscBoundedSender},
};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalErrorSource {
  DirectoryCreate { sink_name: String, path: PathBuf },
  FileOpen { sink_name: String, path: PathBuf },
  Stat { sink_name: String, path: PathBuf },
  Write { sink_name: String, path: PathBuf },
  Flush { sink_name: String, path: PathBuf },
}

impl InternalErrorSource {
  /// Maps a recoverable I/O error from the writer onto a report source.
  pub(crate) fn from_io_error(sink_name: &str, error: &Error) -> Option<Self> {
    let sink_name = sink_name.to_string();
    match error {
      Error::DirectoryCreate { path, .. } => Some(Self::DirectoryCreate {
        sink_name,
        path: path.clone(),
      }),
      Error::FileOpen { path, .. } => Some(Self::FileOpen {
        sink_name,
        path: path.clone(),
      }),
      Error::Stat { path, .. } => Some(Self::Stat {
        sink_name,
        path: path.clone(),
      }),
      Error::Write { path, .. } => Some(Self::Write {
        sink_name,
        path: path.clone(),
      }),
      _ => None,
    }
  }

  pub fn sink_name(&self) -> &str {
    match self {
      Self::DirectoryCreate { sink_name, .. }
      | Self::FileOpen { sink_name, .. }
      | Self::Stat { sink_name, .. }
      | Self::Write { sink_name, .. }
      | Self::Flush { sink_name, .. } => sink_name,
    }
  }

  pub fn path(&self) -> &Path {
    match self {
      Self::DirectoryCreate { path, .. }
      | Self::FileOpen { path, .. }
      | Self::Stat { path, .. }
      | Self::Write { path, .. }
      | Self::Flush { path, .. } => path,
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      Self::DirectoryCreate { .. } => "DirectoryCreate",
      Self::FileOpen { .. } => "FileOpen",
      Self::Stat { .. } => "Stat",
      Self::Write { .. } => "Write",
      Self::Flush { .. } => "Flush",
    }
  }
}

impl fmt::Display for InternalErrorSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} {{ sink_name: \"{}\", path: {:?} }}",
      self.kind(),
      self.sink_name(),
      self.path()
    )
  }
}

#[derive(Debug)]
pub struct InternalErrorReport {
  pub source: InternalErrorSource,
  pub error_message: String,
  pub context: Option<String>,
  pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl InternalErrorReport {
  pub(crate) fn new<E: std::error::Error + 'static>(
    source: InternalErrorSource,
    error: &E,
    context: Option<String>,
  ) -> Self {
    Self {
      source,
      error_message: error.to_string(),
      context,
      timestamp: chrono::Utc::now(),
    }
  }
}

pub type InternalErrorReceiver = FibreMpscBoundedReceiver<InternalErrorReport>;

/// Where sinks send reports about dropped events.
///
/// With a channel attached, reports are offered without blocking; a full
/// channel or a detached reporter falls back to stderr.
#[derive(Clone, Default)]
pub struct ErrorReporter {
  tx: Option<Arc<FibreMpscBoundedSender<InternalErrorReport>>>,
}

impl ErrorReporter {
  /// A reporter that only prints to stderr.
  pub fn stderr() -> Self {
    Self { tx: None }
  }

  /// A reporter backed by a bounded channel of `capacity` reports.
  pub fn channel(capacity: usize) -> (Self, InternalErrorReceiver) {
    let (tx, rx) = mpsc::bounded::<InternalErrorReport>(capacity.max(1));
    (Self { tx: Some(Arc::new(tx)) }, rx)
  }

  pub fn is_channel(&self) -> bool {
    self.tx.is_some()
  }

  pub(crate) fn report<E: std::error::Error + 'static>(
    &self,
    source: InternalErrorSource,
    error: &E,
    context: Option<String>,
  ) {
    match &self.tx {
      Some(tx) => {
        let report = InternalErrorReport::new(source, error, context);
        if let Some((reason, report)) = offer(tx, report) {
          eprintln!(
            "[fibre_logfile:ERROR] Internal error channel {}. {}: {}",
            reason, report.source, report.error_message
          );
        }
      }
      None => eprintln!("[fibre_logfile:ERROR] {}: {}", source, error),
    }
  }
}

/// Offers a report without blocking. Hands it back, with the reason, when
/// the channel is full or its receiver is gone.
fn offer(
  tx: &FibreMpscBoundedSender<InternalErrorReport>,
  report: InternalErrorReport,
) -> Option<(&'static str, InternalErrorReport)> {
  match tx.try_send(report) {
    Ok(()) => None,
    Err(FibreTrySendError::Full(report)) => Some(("full", report)),
    Err(FibreTrySendError::Closed(report)) | Err(FibreTrySendError::Sent(report)) => {
      Some(("closed", report))
    }
  }
}

impl fmt::Debug for ErrorReporter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ErrorReporter")
      .field("channel", &self.is_channel())
      .finish()
  }
}
