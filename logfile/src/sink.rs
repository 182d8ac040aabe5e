use crate::config::processed::SinkConfig;
use crate::config::raw::SinkOptions;
use crate::config::store::ConfigStore;
use crate::error::Result;
use crate::error_handling::{ErrorReporter, InternalErrorSource};
use crate::filter::{self, DropReason};
use crate::model::LogEvent;
use crate::template::{render, FieldContext};
use crate::writer::{RotatingFileWriter, WriteOutcome};

use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of handing one event to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
  Written {
    path: PathBuf,
    /// True if a stale handle had to be replaced first.
    reopened: bool,
  },
  Dropped(DropReason),
}

impl EventOutcome {
  pub fn is_written(&self) -> bool {
    matches!(self, EventOutcome::Written { .. })
  }
}

struct SinkState {
  config: SinkConfig,
  writer: RotatingFileWriter,
}

/// A named log sink writing rendered events to a templated file path.
///
/// Every entry point takes the same lock, so events, reconfiguration and
/// path queries are serialized per sink. Events are processed to completion
/// in the order they are handed in.
pub struct FileSink {
  name: String,
  store: Arc<ConfigStore>,
  reporter: ErrorReporter,
  state: Mutex<SinkState>,
}

impl FileSink {
  /// Builds a sink from the options stored under `name`, merged with
  /// `overrides`. Nothing is opened until the first accepted event.
  pub fn new(
    name: impl Into<String>,
    store: Arc<ConfigStore>,
    overrides: &SinkOptions,
    reporter: ErrorReporter,
  ) -> Result<Self> {
    let name = name.into();
    let config = store.configure(&name, overrides)?;
    let writer = RotatingFileWriter::new(config.open_options);
    Ok(Self {
      name,
      store,
      reporter,
      state: Mutex::new(SinkState { config, writer }),
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Filters, renders and writes one event.
  ///
  /// Filesystem failures never escape: the event is dropped, the writer is
  /// reset, a report goes to the error reporter, and the next event tries a
  /// fresh open.
  pub fn handle_event(&self, event: &LogEvent) -> EventOutcome {
    let mut guard = self.state.lock();
    let SinkState { config, writer } = &mut *guard;

    let forwarded = match filter::evaluate(event, config) {
      Ok(forwarded) => forwarded,
      Err(reason) => return EventOutcome::Dropped(reason),
    };
    let Some(path_template) = &config.path_template else {
      return EventOutcome::Dropped(DropReason::Disabled);
    };

    let path = PathBuf::from(render(path_template, &FieldContext::for_path(event)));
    let line = render(
      &config.format_template,
      &FieldContext::for_format(event, forwarded),
    );

    match writer.write(&path, line.as_bytes()) {
      Ok(outcome) => EventOutcome::Written {
        path,
        reopened: outcome == WriteOutcome::Reopened,
      },
      Err(e) => {
        if let Some(source) = InternalErrorSource::from_io_error(&self.name, &e) {
          self.reporter.report(
            source,
            &e,
            Some(format!("Dropped {} event: {}", event.level, event.message)),
          );
        }
        EventOutcome::Dropped(DropReason::Io)
      }
    }
  }

  /// Merges `overrides` into the stored options and swaps in the result.
  ///
  /// The open file is carried over untouched; a changed path is picked up by
  /// the next event. On error the previous configuration stays active.
  pub fn configure(&self, overrides: &SinkOptions) -> Result<()> {
    let mut state = self.state.lock();
    let config = self.store.configure(&self.name, overrides)?;
    state.writer.set_options(config.open_options);
    state.config = config;
    Ok(())
  }

  /// The resolved output path, or `None` while the sink is disabled.
  ///
  /// A path without placeholders is known up front; a templated one is the
  /// last path an event resolved to.
  pub fn path(&self) -> Option<PathBuf> {
    let state = self.state.lock();
    let template = state.config.path_template.as_ref()?;
    template
      .as_literal()
      .map(PathBuf::from)
      .or_else(|| state.writer.current_path().map(PathBuf::from))
  }

  /// A copy of the active configuration.
  pub fn config(&self) -> SinkConfig {
    self.state.lock().config.clone()
  }

  /// Pushes delayed writes to disk.
  pub fn flush(&self) {
    let mut state = self.state.lock();
    if let Err(e) = state.writer.flush() {
      let path = state.writer.current_path().map(PathBuf::from).unwrap_or_default();
      self.reporter.report(
        InternalErrorSource::Flush {
          sink_name: self.name.clone(),
          path,
        },
        &e,
        None,
      );
    }
  }
}

impl fmt::Debug for FileSink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FileSink")
      .field("name", &self.name)
      .field("path", &self.path())
      .finish()
  }
}
