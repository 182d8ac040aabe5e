use super::{CompiledTemplate, Field, Segment};
use crate::model::{Level, LogEvent, LogValue};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::borrow::Cow;
use std::fmt::Write;

/// The values a template can draw on for one event.
///
/// Format contexts carry the whitelist-filtered metadata; path contexts carry
/// the event's full metadata so paths can use keys that are never printed.
#[derive(Debug, Clone)]
pub struct FieldContext<'a> {
  timestamp: NaiveDateTime,
  level: Level,
  message: &'a str,
  metadata: Vec<(&'a str, &'a LogValue)>,
}

impl<'a> FieldContext<'a> {
  /// Context for the line format, limited to the forwarded metadata.
  pub fn for_format(event: &'a LogEvent, forwarded: Vec<(&'a str, &'a LogValue)>) -> Self {
    Self {
      timestamp: event.timestamp,
      level: event.level,
      message: &event.message,
      metadata: forwarded,
    }
  }

  /// Context for the path template, with the event metadata merged in raw.
  pub fn for_path(event: &'a LogEvent) -> Self {
    Self {
      timestamp: event.timestamp,
      level: event.level,
      message: &event.message,
      metadata: event.metadata.iter().collect(),
    }
  }

  /// Looks up the text for a field. `None` means the field has no value.
  pub fn value(&self, field: &Field) -> Option<Cow<'a, str>> {
    let ts = &self.timestamp;
    let text = match field {
      Field::Message => Cow::Borrowed(self.message),
      Field::Level => Cow::Borrowed(self.level.as_str()),
      Field::Date => Cow::Owned(ts.format("%Y-%m-%d").to_string()),
      Field::Year => Cow::Owned(format!("{:04}", ts.year())),
      Field::Month => Cow::Owned(format!("{:02}", ts.month())),
      Field::Day => Cow::Owned(format!("{:02}", ts.day())),
      Field::Time => Cow::Owned(ts.format("%H:%M:%S%.3f").to_string()),
      Field::Hour => Cow::Owned(format!("{:02}", ts.hour())),
      Field::Min => Cow::Owned(format!("{:02}", ts.minute())),
      Field::Sec => Cow::Owned(format!("{:02}", ts.second())),
      Field::Metadata => {
        let mut out = String::new();
        for (key, value) in &self.metadata {
          let _ = write!(out, "{}={};", key, value);
        }
        Cow::Owned(out)
      }
      Field::Custom(name) => {
        let value: &'a LogValue = self
          .metadata
          .iter()
          .find(|(k, _)| *k == name.as_str())
          .map(|(_, v)| *v)?;
        match value {
          LogValue::String(s) => Cow::Borrowed(s.as_str()),
          other => Cow::Owned(other.to_text()),
        }
      }
    };
    Some(text)
  }
}

/// Renders a compiled template. Missing fields render as empty text.
pub fn render(template: &CompiledTemplate, context: &FieldContext<'_>) -> String {
  let mut output = String::with_capacity(template.source().len() + 64);
  for segment in template.segments() {
    match segment {
      Segment::Literal(text) => output.push_str(text),
      Segment::Field(field) => {
        if let Some(value) = context.value(field) {
          output.push_str(&value);
        }
      }
    }
  }
  output
}
