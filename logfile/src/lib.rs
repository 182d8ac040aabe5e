//! `fibre_logfile` - a file log sink that survives external log rotation.
//!
//! Each sink renders events through two small templates, one for the output
//! path and one for the line, and appends the line to whatever file the path
//! currently names. Before every write the sink compares the on-disk identity
//! of that path with the handle it holds, so a file renamed or deleted by
//! `logrotate` (or a path template rolling over to a new day) is reopened
//! transparently and the triggering line lands in the new file.
//!
//! Sinks can be driven directly through [`FileSink::handle_event`], or wired
//! into `tracing` and `log` with [`subscriber::DispatchLayer`] and
//! [`subscriber::LogHandler`], or set up from a YAML/JSON file with
//! [`init_from_file`].

pub mod config;
pub mod error;
pub mod error_handling;
pub mod filter;
pub mod init;
pub mod model;
pub mod sink;
pub mod subscriber;
pub mod template;
pub mod writer;

// Re-export key public types for easier use by library consumers.
pub use config::processed::{MetadataKeys, OpenOptionsConfig, SinkConfig, DEFAULT_FORMAT};
pub use config::raw::{MetadataSelectionRaw, OpenOptionsRaw, SinkOptions};
pub use config::store::ConfigStore;
pub use error::{Error, Result};
pub use error_handling::{ErrorReporter, InternalErrorReceiver, InternalErrorReport, InternalErrorSource};
pub use filter::DropReason;
pub use model::{Level, LogEvent, LogValue, Metadata};
pub use sink::{EventOutcome, FileSink};

// Public initialization functions
pub use init::{build, find_config_file, init_from_file, load_config, InitResult};
