// examples/rotation_usage.rs

use log::{error, info};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

fn main() -> fibre_logfile::Result<()> {
  let config_path = Path::new(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/examples/fibre_logfile.rotation.yaml"
  ));
  let init = fibre_logfile::init_from_file(config_path)?;
  // `init` must be kept alive to flush all sinks on exit.

  let app_path = init
    .sink("app")
    .and_then(|sink| sink.path())
    .unwrap_or_default();

  for worker in 0..3 {
    tracing::info!(worker, "Worker {} starting", worker);
  }
  info!("Plain log record before rotation");

  // Simulate logrotate moving the file away mid-run.
  let rotated = app_path.with_extension("log.1");
  if let Err(e) = fs::rename(&app_path, &rotated) {
    eprintln!("Could not rotate {:?}: {}", app_path, e);
  }
  thread::sleep(Duration::from_millis(10));

  info!("First line after rotation lands in a fresh file");
  error!("Errors also go to the dated file");

  if let Some(rx) = &init.internal_error_rx {
    while let Ok(report) = rx.try_recv() {
      eprintln!("Internal sink error: {}", report.source);
    }
  }

  println!("Check {:?} and {:?}.", rotated, app_path);
  Ok(())
}
