// Templates drive both the output file path and the rendered log line.
//
// A template is plain text with `$name` placeholders. It is compiled once
// into a list of segments and rendered per event against a `FieldContext`.

mod compile;
mod render;

pub use compile::{compile_format, compile_path};
pub use render::{render, FieldContext};

/// A named value a template can substitute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
  Message,
  Level,
  Date,
  Year,
  Month,
  Day,
  Time,
  Hour,
  Min,
  Sec,
  /// Every forwarded metadata entry, as `key=value;` pairs.
  Metadata,
  /// A metadata key, only produced by path templates.
  Custom(String),
}

impl Field {
  /// Resolves one of the built-in field names.
  pub fn builtin(name: &str) -> Option<Field> {
    let field = match name {
      "message" => Field::Message,
      "level" => Field::Level,
      "date" => Field::Date,
      "year" => Field::Year,
      "month" => Field::Month,
      "day" => Field::Day,
      "time" => Field::Time,
      "hour" => Field::Hour,
      "min" => Field::Min,
      "sec" => Field::Sec,
      "metadata" => Field::Metadata,
      _ => return None,
    };
    Some(field)
  }

  pub fn name(&self) -> &str {
    match self {
      Field::Message => "message",
      Field::Level => "level",
      Field::Date => "date",
      Field::Year => "year",
      Field::Month => "month",
      Field::Day => "day",
      Field::Time => "time",
      Field::Hour => "hour",
      Field::Min => "min",
      Field::Sec => "sec",
      Field::Metadata => "metadata",
      Field::Custom(name) => name,
    }
  }
}

/// Represents a single piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Field(Field),
}

/// A template compiled into its rendering plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
  source: String,
  segments: Vec<Segment>,
}

impl CompiledTemplate {
  pub(crate) fn new(source: &str, segments: Vec<Segment>) -> Self {
    Self {
      source: source.to_string(),
      segments,
    }
  }

  /// The template string this was compiled from.
  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  /// Returns the rendered text if the template has no placeholders.
  pub fn as_literal(&self) -> Option<String> {
    let mut out = String::new();
    for segment in &self.segments {
      match segment {
        Segment::Literal(text) => out.push_str(text),
        Segment::Field(_) => return None,
      }
    }
    Some(out)
  }

  /// True when any segment refers to `name`.
  pub fn references(&self, name: &str) -> bool {
    self
      .segments
      .iter()
      .any(|s| matches!(s, Segment::Field(f) if f.name() == name))
  }
}
