use crate::config::processed::SinkConfig;
use crate::config::raw::SinkOptions;
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Stored options for every sink, keyed by sink name.
///
/// One store is created at startup and shared (usually behind an `Arc`) with
/// the sinks that read and write it. Nothing here touches the filesystem.
#[derive(Debug, Default)]
pub struct ConfigStore {
  entries: RwLock<HashMap<String, SinkOptions>>,
}

impl ConfigStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a store pre-seeded with options, e.g. from a config file.
  pub fn with_entries(entries: HashMap<String, SinkOptions>) -> Self {
    Self {
      entries: RwLock::new(entries),
    }
  }

  pub fn get(&self, name: &str) -> Option<SinkOptions> {
    self.entries.read().get(name).cloned()
  }

  pub fn put(&self, name: &str, options: SinkOptions) {
    self.entries.write().insert(name.to_string(), options);
  }

  pub fn remove(&self, name: &str) -> Option<SinkOptions> {
    self.entries.write().remove(name)
  }

  /// Sorted names of every stored entry.
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
    names.sort();
    names
  }

  /// Merges `overrides` over the options stored for `name` and compiles the
  /// result. The merged options are only persisted if they compile, so a
  /// failed call leaves the stored entry as it was.
  pub fn configure(&self, name: &str, overrides: &SinkOptions) -> Result<SinkConfig> {
    let mut entries = self.entries.write();
    let merged = match entries.get(name) {
      Some(stored) => stored.merged_with(overrides),
      None => overrides.clone(),
    };
    let config = SinkConfig::from_options(name, &merged)?;
    entries.insert(name.to_string(), merged);
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;
  use crate::model::Level;

  #[test]
  fn configure_merges_and_persists() {
    let store = ConfigStore::new();
    store.put(
      "app",
      SinkOptions {
        path: Some(Some("a.log".to_string())),
        level: Some(Some("info".to_string())),
        ..Default::default()
      },
    );

    let config = store
      .configure(
        "app",
        &SinkOptions {
          level: Some(Some("error".to_string())),
          ..Default::default()
        },
      )
      .unwrap();
    assert_eq!(config.min_level, Some(Level::Error));
    assert_eq!(
      config.path_template.as_ref().map(|t| t.source().to_string()),
      Some("a.log".to_string())
    );

    let stored = store.get("app").unwrap();
    assert_eq!(stored.path, Some(Some("a.log".to_string())));
    assert_eq!(stored.level, Some(Some("error".to_string())));
  }

  #[test]
  fn configure_without_stored_entry_uses_overrides() {
    let store = ConfigStore::new();
    let config = store
      .configure(
        "fresh",
        &SinkOptions {
          path: Some(Some("f.log".to_string())),
          ..Default::default()
        },
      )
      .unwrap();
    assert!(config.is_enabled());
    assert_eq!(store.names(), vec!["fresh".to_string()]);
  }

  #[test]
  fn failed_configure_keeps_stored_options() {
    let store = ConfigStore::new();
    let original = SinkOptions {
      path: Some(Some("a.log".to_string())),
      ..Default::default()
    };
    store.put("app", original.clone());

    let err = store
      .configure(
        "app",
        &SinkOptions {
          format: Some(Some("$nope".to_string())),
          ..Default::default()
        },
      )
      .unwrap_err();
    assert!(matches!(err, Error::UnknownField { .. }));
    assert_eq!(store.get("app"), Some(original));
  }

  #[test]
  fn entries_are_independent_per_name() {
    let store = ConfigStore::new();
    store.put("a", SinkOptions::default());
    store.put(
      "b",
      SinkOptions {
        tag: Some(Some("t".to_string())),
        ..Default::default()
      },
    );
    assert_eq!(store.get("a").unwrap().tag, None);
    assert_eq!(store.remove("b").unwrap().tag, Some(Some("t".to_string())));
    assert_eq!(store.names(), vec!["a".to_string()]);
  }
}
