// src/config/processed.rs
use crate::config::raw::{MetadataSelectionRaw, OpenOptionsRaw, SinkOptions};
use crate::error::{Error, Result};
use crate::model::Level;
use crate::template::{compile_format, compile_path, CompiledTemplate};

/// Line format used when none is configured.
pub const DEFAULT_FORMAT: &str = "$time [$level] $message $metadata\n";

/// Which metadata keys flow into the rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataKeys {
  /// Only these keys, in this order, without duplicates.
  Only(Vec<String>),
  /// Every entry of the event, in event order.
  All,
}

impl Default for MetadataKeys {
  fn default() -> Self {
    MetadataKeys::Only(Vec::new())
  }
}

/// Validated file-open options. Append mode is always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptionsConfig {
  /// Delayed-write buffer capacity; `None` flushes every line.
  pub buffer_size: Option<usize>,
  /// Permission bits for newly created files (Unix only).
  pub mode: Option<u32>,
}

/// A sink's compiled configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
  /// `None` disables the sink.
  pub path_template: Option<CompiledTemplate>,
  pub format_template: CompiledTemplate,
  pub min_level: Option<Level>,
  pub metadata_keys: MetadataKeys,
  pub tag_filter: Option<String>,
  /// Every pair must match the event metadata textually.
  pub metadata_filter: Vec<(String, String)>,
  pub open_options: OpenOptionsConfig,
}

impl SinkConfig {
  /// Validates and compiles merged options for the sink `name`.
  pub fn from_options(name: &str, options: &SinkOptions) -> Result<Self> {
    let path_template = set_value(&options.path)
      .map(String::as_str)
      .filter(|p| !p.is_empty())
      .map(compile_path);

    let format = set_value(&options.format).map_or(DEFAULT_FORMAT, String::as_str);
    let format_template = compile_format(format)?;

    let min_level = set_value(&options.level)
      .map(|level| {
        level.parse::<Level>().map_err(|e| Error::InvalidConfigValue {
          field: format!("sinks.{}.level", name),
          message: e.to_string(),
        })
      })
      .transpose()?;

    let metadata_keys = match set_value(&options.metadata) {
      None => MetadataKeys::default(),
      Some(selection) => process_metadata_selection(name, selection)?,
    };

    let metadata_filter = set_value(&options.metadata_filter)
      .map(|filter| {
        filter
          .iter()
          .map(|(k, v)| (k.clone(), v.clone()))
          .collect()
      })
      .unwrap_or_default();

    let open_options = match set_value(&options.opts) {
      None => OpenOptionsConfig::default(),
      Some(raw) => process_open_options(name, raw)?,
    };

    Ok(SinkConfig {
      path_template,
      format_template,
      min_level,
      metadata_keys,
      tag_filter: set_value(&options.tag).cloned(),
      metadata_filter,
      open_options,
    })
  }

  pub fn is_enabled(&self) -> bool {
    self.path_template.is_some()
  }
}

/// The value of an option, treating absent and `null` alike.
fn set_value<T>(option: &Option<Option<T>>) -> Option<&T> {
  option.as_ref().and_then(Option::as_ref)
}

fn process_metadata_selection(name: &str, selection: &MetadataSelectionRaw) -> Result<MetadataKeys> {
  match selection {
    MetadataSelectionRaw::Keyword(keyword) if keyword.eq_ignore_ascii_case("all") => {
      Ok(MetadataKeys::All)
    }
    MetadataSelectionRaw::Keyword(other) => Err(Error::InvalidConfigValue {
      field: format!("sinks.{}.metadata", name),
      message: format!(
        "Unknown metadata selection '{}'. Expected a list of keys or 'all'.",
        other
      ),
    }),
    MetadataSelectionRaw::Keys(keys) => {
      let mut ordered: Vec<String> = Vec::with_capacity(keys.len());
      for key in keys {
        if !ordered.contains(key) {
          ordered.push(key.clone());
        }
      }
      Ok(MetadataKeys::Only(ordered))
    }
  }
}

fn process_open_options(name: &str, raw: &OpenOptionsRaw) -> Result<OpenOptionsConfig> {
  if raw.buffer_size == Some(0) {
    return Err(Error::InvalidConfigValue {
      field: format!("sinks.{}.opts.buffer_size", name),
      message: "buffer_size cannot be zero.".to_string(),
    });
  }
  if let Some(mode) = raw.mode {
    if mode > 0o7777 {
      return Err(Error::InvalidConfigValue {
        field: format!("sinks.{}.opts.mode", name),
        message: format!("File mode {:#o} is out of range.", mode),
      });
    }
  }
  Ok(OpenOptionsConfig {
    buffer_size: raw.buffer_size,
    mode: raw.mode,
  })
}
