// src/subscriber/log_handler.rs

use crate::{
  model::{Level, LogEvent},
  subscriber::SinkSet,
};
use chrono::{Local, Utc};
use log::{Metadata as LogMetadata, Record};

/// A `log::Log` implementation that forwards records to the file sinks.
pub struct LogHandler {
  sinks: SinkSet,
  utc_timestamps: bool,
}

impl LogHandler {
  pub fn new(sinks: SinkSet) -> Self {
    Self {
      sinks,
      utc_timestamps: false,
    }
  }

  pub fn with_utc_timestamps(mut self, utc: bool) -> Self {
    self.utc_timestamps = utc;
    self
  }

  /// Converts a `log::Record` into a `LogEvent`.
  fn build_log_event(&self, record: &Record<'_>) -> LogEvent {
    let timestamp = if self.utc_timestamps {
      Utc::now().naive_utc()
    } else {
      Local::now().naive_local()
    };
    let mut event = LogEvent::at(
      Level::from(record.level()),
      record.args().to_string(),
      timestamp,
    );

    event.metadata.insert("target", record.target());
    if let Some(path) = record.module_path() {
      event.metadata.insert("module_path", path);
    }
    if let Some(file) = record.file() {
      event.metadata.insert("file", file);
    }
    if let Some(line) = record.line() {
      event.metadata.insert("line", i64::from(line));
    }
    event
  }
}

impl log::Log for LogHandler {
  fn enabled(&self, metadata: &LogMetadata) -> bool {
    metadata.level() <= log::max_level()
  }

  fn log(&self, record: &Record) {
    if !self.enabled(record.metadata()) {
      return;
    }
    let event = self.build_log_event(record);
    self.sinks.deliver(&event);
  }

  fn flush(&self) {
    self.sinks.flush();
  }
}
