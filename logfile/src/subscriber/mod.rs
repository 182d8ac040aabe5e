// Adapters that deliver events from the `tracing` and `log` ecosystems to sinks.

mod dispatch;
mod log_handler;
pub mod visitor;

pub use dispatch::DispatchLayer;
pub use log_handler::LogHandler;

use crate::model::LogEvent;
use crate::sink::FileSink;
use std::sync::Arc;

/// The set of sinks every adapter fans an event out to.
#[derive(Debug, Clone, Default)]
pub struct SinkSet {
  sinks: Vec<Arc<FileSink>>,
}

impl SinkSet {
  pub fn new(sinks: Vec<Arc<FileSink>>) -> Self {
    Self { sinks }
  }

  pub fn sinks(&self) -> &[Arc<FileSink>] {
    &self.sinks
  }

  /// Hands the event to each sink in turn.
  pub fn deliver(&self, event: &LogEvent) {
    for sink in &self.sinks {
      sink.handle_event(event);
    }
  }

  pub fn flush(&self) {
    for sink in &self.sinks {
      sink.flush();
    }
  }
}
