use super::de::nullable;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct InternalErrorReportingRaw {
  #[serde(default)] // Defaults to false if not present
  pub enabled: bool,
  #[serde(default = "default_error_buffer_size")]
  pub buffer_size: usize,
}

fn default_error_buffer_size() -> usize {
  256
}

impl Default for InternalErrorReportingRaw {
  fn default() -> Self {
    Self {
      enabled: false,
      buffer_size: default_error_buffer_size(),
    }
  }
}

// --- Top Level Config ---
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigRaw {
  #[serde(default = "default_version")]
  pub version: u32,
  #[serde(default)]
  pub sinks: HashMap<String, SinkOptions>,
  #[serde(default)]
  pub internal_error_reporting: InternalErrorReportingRaw,
  /// Stamp host-delivered events in UTC instead of local time.
  #[serde(default)]
  pub utc_timestamps: bool,
}

fn default_version() -> u32 {
  1
}

impl Default for ConfigRaw {
  fn default() -> Self {
    Self {
      version: default_version(),
      sinks: HashMap::new(),
      internal_error_reporting: Default::default(),
      utc_timestamps: false,
    }
  }
}

// --- Sink Options ---

/// The options recognised for one sink, used both as stored options and as
/// an override on top of them.
///
/// Each field is `None` when the key is absent, `Some(None)` when it was
/// given as `null`, and `Some(Some(value))` otherwise. An absent key keeps
/// the stored value on merge, while `null` resets the option to its default.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct SinkOptions {
  /// Minimum severity to accept; unset accepts all.
  #[serde(default, deserialize_with = "nullable")]
  pub level: Option<Option<String>>,
  /// Output file path template; unset or empty disables the sink.
  #[serde(default, deserialize_with = "nullable")]
  pub path: Option<Option<String>>,
  /// Line format template.
  #[serde(default, deserialize_with = "nullable")]
  pub format: Option<Option<String>>,
  /// Metadata keys forwarded into the line, or `"all"`.
  #[serde(default, deserialize_with = "nullable")]
  pub metadata: Option<Option<MetadataSelectionRaw>>,
  /// Only accept events whose `tag` metadata equals this.
  #[serde(default, deserialize_with = "nullable")]
  pub tag: Option<Option<String>>,
  /// Only accept events carrying every one of these metadata values.
  #[serde(default, deserialize_with = "nullable")]
  pub metadata_filter: Option<Option<BTreeMap<String, String>>>,
  /// File open options.
  #[serde(default, deserialize_with = "nullable")]
  pub opts: Option<Option<OpenOptionsRaw>>,
}

impl SinkOptions {
  /// Field-wise merge; any key present in `overrides` wins, `null` included.
  pub fn merged_with(&self, overrides: &SinkOptions) -> SinkOptions {
    SinkOptions {
      level: overrides.level.clone().or_else(|| self.level.clone()),
      path: overrides.path.clone().or_else(|| self.path.clone()),
      format: overrides.format.clone().or_else(|| self.format.clone()),
      metadata: overrides.metadata.clone().or_else(|| self.metadata.clone()),
      tag: overrides.tag.clone().or_else(|| self.tag.clone()),
      metadata_filter: overrides
        .metadata_filter
        .clone()
        .or_else(|| self.metadata_filter.clone()),
      opts: overrides.opts.clone().or_else(|| self.opts.clone()),
    }
  }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum MetadataSelectionRaw {
  Keys(Vec<String>),
  /// Only `"all"` is meaningful; anything else is rejected on processing.
  Keyword(String),
}

#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct OpenOptionsRaw {
  /// Buffer writes up to this many bytes instead of flushing every line.
  pub buffer_size: Option<usize>,
  /// Unix permission bits for newly created files, e.g. `0o640`.
  pub mode: Option<u32>,
}
