// src/subscriber/visitor.rs
use crate::model::{LogValue, Metadata};
use tracing::field::{Field, Visit};

/// Collects a `tracing` event's fields into a message and ordered metadata.
pub struct LogEventFieldVisitor<'a> {
  metadata: &'a mut Metadata,
  message: &'a mut Option<String>,
  // Suffix for repeated `message` fields
  message_field_count: u32,
}

impl<'a> LogEventFieldVisitor<'a> {
  pub fn new(message: &'a mut Option<String>, metadata: &'a mut Metadata) -> Self {
    Self {
      metadata,
      message,
      message_field_count: 0,
    }
  }

  fn record_value(&mut self, field_name: &str, value: LogValue) {
    if field_name != "message" {
      self.metadata.insert(field_name, value);
      return;
    }

    if self.message.is_none() {
      *self.message = Some(value.to_text());
    } else {
      // Message is already set, keep this one under a disambiguated key.
      self.message_field_count += 1;
      let disambiguated_key = format!("message.{}", self.message_field_count);
      self.metadata.insert(disambiguated_key, value);
    }
  }
}

impl<'a> Visit for LogEventFieldVisitor<'a> {
  fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
    self.record_value(field.name(), LogValue::Debug(format!("{:?}", value)));
  }

  fn record_str(&mut self, field: &Field, value: &str) {
    self.record_value(field.name(), LogValue::String(value.to_string()));
  }

  fn record_i64(&mut self, field: &Field, value: i64) {
    self.record_value(field.name(), LogValue::Int(value));
  }

  fn record_u64(&mut self, field: &Field, value: u64) {
    let value = match i64::try_from(value) {
      Ok(v) => LogValue::Int(v),
      // Beyond i64, keep the digits as text
      Err(_) => LogValue::String(value.to_string()),
    };
    self.record_value(field.name(), value);
  }

  fn record_f64(&mut self, field: &Field, value: f64) {
    self.record_value(field.name(), LogValue::Float(value));
  }

  fn record_bool(&mut self, field: &Field, value: bool) {
    self.record_value(field.name(), LogValue::Bool(value));
  }
}
