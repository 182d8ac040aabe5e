use chrono::{Local, NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Severity of a log event, totally ordered `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
  Debug,
  Info,
  Warn,
  Error,
}

impl Level {
  pub fn as_str(&self) -> &'static str {
    match self {
      Level::Debug => "debug",
      Level::Info => "info",
      Level::Warn => "warn",
      Level::Error => "error",
    }
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(pub String);

impl fmt::Display for ParseLevelError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Invalid log level string '{}'. Expected debug, info, warn, or error.",
      self.0
    )
  }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
  type Err = ParseLevelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "debug" => Ok(Level::Debug),
      "info" => Ok(Level::Info),
      "warn" | "warning" => Ok(Level::Warn),
      "error" => Ok(Level::Error),
      _ => Err(ParseLevelError(s.to_string())),
    }
  }
}

impl From<&tracing_core::Level> for Level {
  fn from(level: &tracing_core::Level) -> Self {
    match *level {
      tracing_core::Level::ERROR => Level::Error,
      tracing_core::Level::WARN => Level::Warn,
      tracing_core::Level::INFO => Level::Info,
      // TRACE has no counterpart, it folds into debug.
      _ => Level::Debug,
    }
  }
}

impl From<log::Level> for Level {
  fn from(level: log::Level) -> Self {
    match level {
      log::Level::Error => Level::Error,
      log::Level::Warn => Level::Warn,
      log::Level::Info => Level::Info,
      log::Level::Debug | log::Level::Trace => Level::Debug,
    }
  }
}

/// Represents a loggable value, part of a `LogEvent`'s metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
  String(String),
  Int(i64),
  Float(f64),
  Bool(bool),
  /// Already rendered through `Debug`.
  Debug(String),
}

impl LogValue {
  /// Text used when this value is substituted into a template.
  pub fn to_text(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for LogValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LogValue::String(s) => f.write_str(s),
      LogValue::Int(i) => write!(f, "{}", i),
      LogValue::Float(v) => write!(f, "{:?}", v),
      LogValue::Bool(b) => write!(f, "{}", b),
      LogValue::Debug(s) => f.write_str(s),
    }
  }
}

impl From<&str> for LogValue {
  fn from(value: &str) -> Self {
    LogValue::String(value.to_string())
  }
}

impl From<String> for LogValue {
  fn from(value: String) -> Self {
    LogValue::String(value)
  }
}

impl From<i64> for LogValue {
  fn from(value: i64) -> Self {
    LogValue::Int(value)
  }
}

impl From<f64> for LogValue {
  fn from(value: f64) -> Self {
    LogValue::Float(value)
  }
}

impl From<bool> for LogValue {
  fn from(value: bool) -> Self {
    LogValue::Bool(value)
  }
}

/// Ordered key/value metadata attached to an event.
///
/// Keys are unique; inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
  entries: Vec<(String, LogValue)>,
}

impl Metadata {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<LogValue>) {
    let key = key.into();
    let value = value.into();
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&LogValue> {
    self
      .entries
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &LogValue)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<K: Into<String>, V: Into<LogValue>> FromIterator<(K, V)> for Metadata {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut metadata = Metadata::new();
    for (k, v) in iter {
      metadata.insert(k, v);
    }
    metadata
  }
}

/// A single log event as delivered to a sink.
#[derive(Debug, Clone)]
pub struct LogEvent {
  pub level: Level,
  pub message: String,
  /// Wall-clock time of the event, already in the zone it should be rendered in.
  pub timestamp: NaiveDateTime,
  pub metadata: Metadata,
}

impl LogEvent {
  /// Creates an event stamped with the current local time.
  pub fn new(level: Level, message: impl Into<String>) -> Self {
    Self::at(level, message, Local::now().naive_local())
  }

  /// Creates an event stamped with the current UTC time.
  pub fn new_utc(level: Level, message: impl Into<String>) -> Self {
    Self::at(level, message, Utc::now().naive_utc())
  }

  pub fn at(level: Level, message: impl Into<String>, timestamp: NaiveDateTime) -> Self {
    LogEvent {
      level,
      message: message.into(),
      timestamp,
      metadata: Metadata::new(),
    }
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<LogValue>) -> Self {
    self.metadata.insert(key, value);
    self
  }
}
