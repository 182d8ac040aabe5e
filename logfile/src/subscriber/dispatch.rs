// src/subscriber/dispatch.rs
// Defines the Layer that hands `tracing` events to the file sinks.

use crate::{
  model::{Level, LogEvent, Metadata},
  subscriber::{visitor::LogEventFieldVisitor, SinkSet},
};
use chrono::{Local, NaiveDateTime, Utc};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
  layer::{Context, Layer},
  registry::LookupSpan,
};

/// A `tracing_subscriber` layer feeding every event to a set of sinks.
///
/// Events are delivered synchronously from the emitting thread; each sink
/// serializes them behind its own lock.
pub struct DispatchLayer {
  sinks: SinkSet,
  utc_timestamps: bool,
}

impl DispatchLayer {
  pub fn new(sinks: SinkSet) -> Self {
    Self {
      sinks,
      utc_timestamps: false,
    }
  }

  /// Stamp events in UTC rather than local time.
  pub fn with_utc_timestamps(mut self, utc: bool) -> Self {
    self.utc_timestamps = utc;
    self
  }

  fn now(&self) -> NaiveDateTime {
    if self.utc_timestamps {
      Utc::now().naive_utc()
    } else {
      Local::now().naive_local()
    }
  }

  /// Converts a `tracing::Event` into a `LogEvent`.
  fn build_log_event(&self, event: &Event<'_>) -> LogEvent {
    let metadata = event.metadata();
    let mut message = None;
    let mut fields = Metadata::new();
    fields.insert("target", metadata.target());

    let mut visitor = LogEventFieldVisitor::new(&mut message, &mut fields);
    event.record(&mut visitor);

    let mut log_event = LogEvent::at(
      Level::from(metadata.level()),
      message.unwrap_or_default(),
      self.now(),
    );
    log_event.metadata = fields;
    log_event
  }
}

impl<S> Layer<S> for DispatchLayer
where
  S: Subscriber + for<'span> LookupSpan<'span>,
{
  fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
    let log_event = self.build_log_event(event);
    self.sinks.deliver(&log_event);
  }
}
