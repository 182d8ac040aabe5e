// Contains the primary public initialization functions for fibre_logfile.

use crate::{
  config::{raw::ConfigRaw, store::ConfigStore},
  error::{Error, Result},
  error_handling::{ErrorReporter, InternalErrorReceiver},
  sink::FileSink,
  subscriber::{DispatchLayer, LogHandler, SinkSet},
};

use std::{
  collections::HashMap,
  env,
  fs::File as StdFsFile,
  io,
  path::{Path, PathBuf},
  sync::Arc,
};

use tracing_subscriber::prelude::*;

const CONFIG_BASE_NAME: &str = "fibre_logfile";
const CONFIG_EXTENSION: &str = "yaml";

/// Everything `init_from_file` set up. Dropping it flushes every sink.
#[must_use = "The InitResult must be kept alive so buffered log lines are flushed on exit"]
pub struct InitResult {
  pub store: Arc<ConfigStore>,
  pub sinks: HashMap<String, Arc<FileSink>>,
  /// Present when `internal_error_reporting.enabled` is set.
  pub internal_error_rx: Option<InternalErrorReceiver>,
  pub(crate) utc_timestamps: bool,
}

impl InitResult {
  pub fn sink(&self, name: &str) -> Option<&Arc<FileSink>> {
    self.sinks.get(name)
  }

  /// The sinks in name order, ready to hand to a `DispatchLayer` or `LogHandler`.
  pub fn sink_set(&self) -> SinkSet {
    let mut names: Vec<&String> = self.sinks.keys().collect();
    names.sort();
    SinkSet::new(names.into_iter().map(|n| Arc::clone(&self.sinks[n])).collect())
  }

  /// A tracing layer over these sinks.
  pub fn layer(&self) -> DispatchLayer {
    DispatchLayer::new(self.sink_set()).with_utc_timestamps(self.utc_timestamps)
  }

  /// A `log` handler over these sinks.
  pub fn log_handler(&self) -> LogHandler {
    LogHandler::new(self.sink_set()).with_utc_timestamps(self.utc_timestamps)
  }
}

impl Drop for InitResult {
  fn drop(&mut self) {
    for sink in self.sinks.values() {
      sink.flush();
    }
  }
}

/// Candidate config file names, most specific first.
fn config_candidates(environment: Option<&str>) -> Vec<PathBuf> {
  environment
    .filter(|e| !e.is_empty())
    .map(|e| format!("{}.{}.{}", CONFIG_BASE_NAME, e, CONFIG_EXTENSION))
    .into_iter()
    .chain(Some(format!("{}.{}", CONFIG_BASE_NAME, CONFIG_EXTENSION)))
    .map(PathBuf::from)
    .collect()
}

/// Looks for `fibre_logfile.<env>.yaml`, then `fibre_logfile.yaml`, in the
/// working directory.
///
/// `<env>` is `environment_suffix` if given, else `FIBRE_ENV`, else `APP_ENV`.
pub fn find_config_file(environment_suffix: Option<&str>) -> Result<PathBuf> {
  let environment = environment_suffix
    .map(str::to_owned)
    .or_else(|| env::var("FIBRE_ENV").ok())
    .or_else(|| env::var("APP_ENV").ok());

  let candidates = config_candidates(environment.as_deref());
  match candidates.iter().find(|path| path.is_file()) {
    Some(path) => Ok(path.clone()),
    None => Err(Error::ConfigNotFound(format!(
      "None of {:?} exists in the working directory",
      candidates
    ))),
  }
}

/// Reads a YAML, or JSON by `.json` extension, configuration document.
pub fn load_config(config_path: &Path) -> Result<ConfigRaw> {
  let file = StdFsFile::open(config_path)?;
  let reader = io::BufReader::new(file);
  let is_json = config_path
    .extension()
    .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

  if is_json {
    serde_json::from_reader(reader).map_err(|e| Error::ConfigParse(e.to_string()))
  } else {
    serde_yaml::from_reader(reader).map_err(|e| Error::ConfigParse(e.to_string()))
  }
}

/// Builds the store and every configured sink without touching global state.
pub fn build(raw_config: ConfigRaw) -> Result<InitResult> {
  let (reporter, internal_error_rx) = if raw_config.internal_error_reporting.enabled {
    let (reporter, rx) = ErrorReporter::channel(raw_config.internal_error_reporting.buffer_size);
    (reporter, Some(rx))
  } else {
    (ErrorReporter::stderr(), None)
  };

  let store = Arc::new(ConfigStore::with_entries(raw_config.sinks));
  let mut sinks = HashMap::new();
  for name in store.names() {
    let sink = FileSink::new(
      name.clone(),
      Arc::clone(&store),
      &Default::default(),
      reporter.clone(),
    )?;
    sinks.insert(name, Arc::new(sink));
  }

  Ok(InitResult {
    store,
    sinks,
    internal_error_rx,
    utc_timestamps: raw_config.utc_timestamps,
  })
}

/// Initializes `fibre_logfile` from a configuration file path and installs it
/// as both the global `log` logger and the global tracing subscriber.
pub fn init_from_file(config_path: &Path) -> Result<InitResult> {
  println!(
    "[fibre_logfile] Initializing from config file: {:?}",
    config_path
  );

  let init_result = build(load_config(config_path)?)?;
  for (name, sink) in &init_result.sinks {
    match sink.path() {
      Some(path) => println!("[fibre_logfile] Sink '{}' writing to {:?}", name, path),
      None if sink.config().is_enabled() => {
        println!("[fibre_logfile] Sink '{}' path resolves per event", name)
      }
      None => println!("[fibre_logfile] Sink '{}' has no path and is disabled", name),
    }
  }

  log::set_boxed_logger(Box::new(init_result.log_handler()))
    .map_err(|e| Error::LogBridgeInit(e.to_string()))?;
  log::set_max_level(log::LevelFilter::Trace);

  let subscriber = tracing_subscriber::registry().with(init_result.layer());
  tracing::subscriber::set_global_default(subscriber)
    .map_err(|e| Error::GlobalSubscriberSet(e.to_string()))?;

  println!("[fibre_logfile] Initialization complete.");
  Ok(init_result)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::raw::SinkOptions;
  use std::fs;
  use tempfile::{tempdir, NamedTempFile};

  #[test]
  fn config_candidates_put_environment_first() {
    assert_eq!(
      config_candidates(Some("staging")),
      vec![
        PathBuf::from("fibre_logfile.staging.yaml"),
        PathBuf::from("fibre_logfile.yaml"),
      ]
    );
    assert_eq!(config_candidates(Some("")), vec![PathBuf::from("fibre_logfile.yaml")]);
    assert_eq!(config_candidates(None), vec![PathBuf::from("fibre_logfile.yaml")]);
  }

  #[test]
  fn find_config_file_not_found() {
    let result = find_config_file(Some("no_such_env"));
    assert!(matches!(result, Err(Error::ConfigNotFound(_))));
  }

  #[test]
  fn load_yaml_and_json_documents() {
    let yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    fs::write(yaml.path(), "sinks:\n  app:\n    path: app.log\n").unwrap();
    let raw = load_config(yaml.path()).unwrap();
    assert_eq!(raw.sinks["app"].path, Some(Some("app.log".to_string())));

    let json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    fs::write(
      json.path(),
      r#"{"sinks": {"app": {"path": "app.log", "metadata": ["a"]}}}"#,
    )
    .unwrap();
    let raw = load_config(json.path()).unwrap();
    assert_eq!(raw.sinks["app"].path, Some(Some("app.log".to_string())));
  }

  #[test]
  fn malformed_config_is_a_parse_error() {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), "sinks: [not, a, map]").unwrap();
    assert!(matches!(load_config(file.path()), Err(Error::ConfigParse(_))));
  }

  #[test]
  fn build_creates_one_sink_per_entry() {
    let dir = tempdir().unwrap();
    let mut raw = ConfigRaw::default();
    raw.sinks.insert(
      "main".to_string(),
      SinkOptions {
        path: Some(Some(dir.path().join("main.log").display().to_string())),
        ..Default::default()
      },
    );
    raw.sinks.insert("off".to_string(), SinkOptions::default());
    raw.internal_error_reporting.enabled = true;

    let init = build(raw).unwrap();
    assert_eq!(init.sinks.len(), 2);
    assert!(init.internal_error_rx.is_some());
    assert_eq!(init.sink("main").unwrap().path(), Some(dir.path().join("main.log")));
    assert_eq!(init.sink("off").unwrap().path(), None);
    assert_eq!(init.sink_set().sinks()[0].name(), "main");
  }

  #[test]
  fn build_fails_on_invalid_sink() {
    let mut raw = ConfigRaw::default();
    raw.sinks.insert(
      "bad".to_string(),
      SinkOptions {
        format: Some(Some("$bogus".to_string())),
        ..Default::default()
      },
    );
    assert!(matches!(build(raw), Err(Error::UnknownField { .. })));
  }
}
