// Decides, per event, whether a sink takes it and which metadata flows on.

use crate::config::processed::{MetadataKeys, SinkConfig};
use crate::model::{LogEvent, LogValue};
use std::fmt;

/// Metadata entries forwarded into the format context, in forwarding order.
pub type Forwarded<'a> = Vec<(&'a str, &'a LogValue)>;

/// Why an event did not reach the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
  /// No path is configured; the sink drops everything.
  Disabled,
  /// The event's level is below the configured minimum.
  BelowLevel,
  /// The tag or metadata filter did not match.
  Filtered,
  /// A filesystem operation failed; the event was discarded.
  Io,
}

impl fmt::Display for DropReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      DropReason::Disabled => "sink disabled",
      DropReason::BelowLevel => "below minimum level",
      DropReason::Filtered => "filtered out",
      DropReason::Io => "i/o failure",
    };
    f.write_str(text)
  }
}

/// Checks an event against the sink configuration.
///
/// On acceptance, returns the metadata to forward into the line format.
pub fn evaluate<'a>(event: &'a LogEvent, config: &SinkConfig) -> Result<Forwarded<'a>, DropReason> {
  if config.path_template.is_none() {
    return Err(DropReason::Disabled);
  }

  if let Some(min_level) = config.min_level {
    if event.level < min_level {
      return Err(DropReason::BelowLevel);
    }
  }

  if let Some(tag) = &config.tag_filter {
    if !value_matches(event, "tag", tag) {
      return Err(DropReason::Filtered);
    }
  }

  if !config
    .metadata_filter
    .iter()
    .all(|(key, expected)| value_matches(event, key, expected))
  {
    return Err(DropReason::Filtered);
  }

  Ok(forward_metadata(event, &config.metadata_keys))
}

/// True if the event would be written by a sink with this configuration.
pub fn accepts(event: &LogEvent, config: &SinkConfig) -> bool {
  evaluate(event, config).is_ok()
}

/// Reduces event metadata to the whitelisted keys, in whitelist order.
/// Whitelisted keys the event lacks are simply left out.
pub fn forward_metadata<'a>(event: &'a LogEvent, keys: &MetadataKeys) -> Forwarded<'a> {
  match keys {
    MetadataKeys::All => event.metadata.iter().collect(),
    MetadataKeys::Only(keys) => keys
      .iter()
      .filter_map(|key| {
        event
          .metadata
          .iter()
          .find(|(k, _)| *k == key.as_str())
      })
      .collect(),
  }
}

fn value_matches(event: &LogEvent, key: &str, expected: &str) -> bool {
  event
    .metadata
    .get(key)
    .map_or(false, |value| value.to_text() == expected)
}
