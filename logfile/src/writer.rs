// The file writer behind a sink. It keeps one handle open and, before every
// write, checks that the path still names the file that handle points at.
// Anything that swaps the file out from under us (logrotate renaming it, an
// operator deleting it, the path template moving to a new day) shows up as
// an identity change and costs one reopen, never the pending write.

use crate::config::processed::OpenOptionsConfig;
use crate::error::{Error, Result};

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// A stable on-disk token for a file, independent of the path used to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
  #[cfg(unix)]
  dev: u64,
  #[cfg(unix)]
  ino: u64,
  #[cfg(not(unix))]
  created: Option<std::time::SystemTime>,
}

impl FileIdentity {
  #[cfg(unix)]
  pub fn from_metadata(metadata: &fs::Metadata) -> Self {
    use std::os::unix::fs::MetadataExt;
    Self {
      dev: metadata.dev(),
      ino: metadata.ino(),
    }
  }

  // Without inode numbers, the creation time tells a recreated file apart.
  #[cfg(not(unix))]
  pub fn from_metadata(metadata: &fs::Metadata) -> Self {
    Self {
      created: metadata.created().ok(),
    }
  }

  /// False when the platform gave nothing to tell files apart by. Such an
  /// identity never matches, so every write reopens the path.
  #[cfg(unix)]
  pub fn is_known(&self) -> bool {
    true
  }

  #[cfg(not(unix))]
  pub fn is_known(&self) -> bool {
    self.created.is_some()
  }

  /// Identity of whatever file `path` currently resolves to.
  pub fn of_path(path: &Path) -> io::Result<Self> {
    fs::metadata(path).map(|m| Self::from_metadata(&m))
  }
}

/// What a successful write had to do first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  /// Appended through the handle that was already open.
  Appended,
  /// Nothing was open; the file was opened for this write.
  Opened,
  /// The open handle no longer matched the path and was replaced.
  Reopened,
}

/// The open handle together with the identity it had when opened.
struct OpenFile {
  path: PathBuf,
  identity: FileIdentity,
  writer: BufWriter<File>,
}

enum HandleCheck {
  Current,
  Missing,
  Stale,
}

/// Appends to a path, following it across external rotation.
///
/// Closed until the first successful open. Every failure closes it again so
/// the next write starts over from a clean open.
pub struct RotatingFileWriter {
  options: OpenOptionsConfig,
  open: Option<OpenFile>,
  last_path: Option<PathBuf>,
}

impl RotatingFileWriter {
  pub fn new(options: OpenOptionsConfig) -> Self {
    Self {
      options,
      open: None,
      last_path: None,
    }
  }

  /// Replaces the open options. The current handle is kept; new options take
  /// effect on the next open.
  pub fn set_options(&mut self, options: OpenOptionsConfig) {
    self.options = options;
  }

  pub fn is_open(&self) -> bool {
    self.open.is_some()
  }

  /// Identity of the file behind the open handle, if any.
  pub fn identity(&self) -> Option<FileIdentity> {
    self.open.as_ref().map(|open| open.identity)
  }

  /// The path most recently written to (or attempted).
  pub fn current_path(&self) -> Option<&Path> {
    self.last_path.as_deref()
  }

  /// Writes `bytes` to the file currently at `path`, reopening first if the
  /// open handle is missing, points elsewhere, or was rotated away.
  pub fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<WriteOutcome> {
    self.last_path = Some(path.to_path_buf());

    let outcome = match self.check_handle(path)? {
      HandleCheck::Current => WriteOutcome::Appended,
      HandleCheck::Missing => {
        self.ensure_open(path)?;
        WriteOutcome::Opened
      }
      HandleCheck::Stale => {
        self.close();
        self.ensure_open(path)?;
        WriteOutcome::Reopened
      }
    };

    self.append(bytes)?;
    Ok(outcome)
  }

  /// Flushes any buffered bytes to the open file.
  pub fn flush(&mut self) -> Result<()> {
    let Some(open) = self.open.as_mut() else {
      return Ok(());
    };
    if let Err(source) = open.writer.flush() {
      let path = open.path.clone();
      self.open = None;
      return Err(Error::Write { path, source });
    }
    Ok(())
  }

  /// Drops the handle, flushing what it buffered into the file it points at.
  pub fn close(&mut self) {
    if let Some(mut open) = self.open.take() {
      if let Err(e) = open.writer.flush() {
        eprintln!(
          "[fibre_logfile:WARN] Failed to flush {:?} while closing: {}",
          open.path, e
        );
      }
    }
  }

  fn check_handle(&mut self, path: &Path) -> Result<HandleCheck> {
    let Some(open) = self.open.as_ref() else {
      return Ok(HandleCheck::Missing);
    };

    // A different path is handled exactly like rotation.
    if open.path != path {
      return Ok(HandleCheck::Stale);
    }

    match FileIdentity::of_path(path) {
      Ok(identity) if identity.is_known() && identity == open.identity => {
        Ok(HandleCheck::Current)
      }
      Ok(_) => Ok(HandleCheck::Stale),
      // Deleted or renamed away with nothing in its place yet.
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HandleCheck::Stale),
      Err(source) => {
        self.close();
        Err(Error::Stat {
          path: path.to_path_buf(),
          source,
        })
      }
    }
  }

  /// Opens `path` for appending, creating parent directories as needed.
  fn ensure_open(&mut self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let file = self
      .open_options()
      .open(path)
      .map_err(|source| Error::FileOpen {
        path: path.to_path_buf(),
        source,
      })?;

    // Take the identity from the handle itself so it describes the file we
    // actually hold, even if the path changes again right after opening.
    let metadata = file.metadata().map_err(|source| Error::Stat {
      path: path.to_path_buf(),
      source,
    })?;

    let capacity = self.options.buffer_size.unwrap_or(DEFAULT_BUFFER_CAPACITY);
    self.open = Some(OpenFile {
      path: path.to_path_buf(),
      identity: FileIdentity::from_metadata(&metadata),
      writer: BufWriter::with_capacity(capacity, file),
    });
    Ok(())
  }

  fn open_options(&self) -> OpenOptions {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    apply_mode(&mut options, self.options.mode);
    options
  }

  fn append(&mut self, bytes: &[u8]) -> Result<()> {
    let delayed = self.options.buffer_size.is_some();
    let Some(open) = self.open.as_mut() else {
      return Err(Error::Write {
        path: self.last_path.clone().unwrap_or_default(),
        source: io::Error::new(io::ErrorKind::NotConnected, "no open log file"),
      });
    };

    let result = open
      .writer
      .write_all(bytes)
      .and_then(|_| if delayed { Ok(()) } else { open.writer.flush() });

    if let Err(source) = result {
      let path = open.path.clone();
      self.open = None;
      return Err(Error::Write { path, source });
    }
    Ok(())
  }
}

#[cfg(unix)]
fn apply_mode(options: &mut OpenOptions, mode: Option<u32>) {
  use std::os::unix::fs::OpenOptionsExt;
  if let Some(mode) = mode {
    options.mode(mode);
  }
}

#[cfg(not(unix))]
fn apply_mode(_options: &mut OpenOptions, _mode: Option<u32>) {}

impl Drop for RotatingFileWriter {
  fn drop(&mut self) {
    self.close();
  }
}

// ===================================================================================
//
//                              TESTS
//
// ===================================================================================
#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::{tempdir, TempDir};

  struct TestSetup {
    temp_dir: TempDir,
    writer: RotatingFileWriter,
  }

  fn setup(options: OpenOptionsConfig) -> TestSetup {
    TestSetup {
      temp_dir: tempdir().unwrap(),
      writer: RotatingFileWriter::new(options),
    }
  }

  fn list_files(dir: &Path) -> Vec<String> {
    let mut files = fs::read_dir(dir)
      .unwrap()
      .map(|res| res.unwrap().file_name().into_string().unwrap())
      .collect::<Vec<String>>();
    files.sort();
    files
  }

  #[test]
  fn first_write_creates_directories_and_file() {
    let mut setup = setup(OpenOptionsConfig::default());
    let path = setup.temp_dir.path().join("nested/deeper/app.log");

    let outcome = setup.writer.write(&path, b"hello\n").unwrap();
    assert_eq!(outcome, WriteOutcome::Opened);
    assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    assert_eq!(setup.writer.current_path(), Some(path.as_path()));
    assert_eq!(
      setup.writer.identity(),
      Some(FileIdentity::of_path(&path).unwrap())
    );
  }

  #[test]
  fn same_file_is_appended_without_reopen() {
    let mut setup = setup(OpenOptionsConfig::default());
    let path = setup.temp_dir.path().join("app.log");

    setup.writer.write(&path, b"one\n").unwrap();
    let identity = setup.writer.identity();
    let outcome = setup.writer.write(&path, b"two\n").unwrap();

    assert_eq!(outcome, WriteOutcome::Appended);
    assert_eq!(setup.writer.identity(), identity);
    assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
  }

  #[test]
  fn identity_is_stable_for_one_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("app.log");
    fs::write(&path, "x").unwrap();

    let first = FileIdentity::of_path(&path).unwrap();
    let second = FileIdentity::of_path(&path).unwrap();
    if first.is_known() {
      assert_eq!(first, second);
    }

    fs::remove_file(&path).unwrap();
    assert!(FileIdentity::of_path(&path).is_err());
  }

  #[test]
  fn existing_content_is_preserved() {
    let mut setup = setup(OpenOptionsConfig::default());
    let path = setup.temp_dir.path().join("app.log");
    fs::write(&path, "earlier\n").unwrap();

    setup.writer.write(&path, b"later\n").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
  }

  #[test]
  fn deleted_file_is_recreated_for_the_pending_write() {
    let mut setup = setup(OpenOptionsConfig::default());
    let path = setup.temp_dir.path().join("app.log");

    setup.writer.write(&path, b"before\n").unwrap();
    fs::remove_file(&path).unwrap();

    let outcome = setup.writer.write(&path, b"after\n").unwrap();
    assert_eq!(outcome, WriteOutcome::Reopened);
    assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");
  }

  #[test]
  fn renamed_file_keeps_old_lines_and_new_file_gets_new_ones() {
    let mut setup = setup(OpenOptionsConfig::default());
    let path = setup.temp_dir.path().join("app.log");
    let rotated = setup.temp_dir.path().join("app.log.1");

    setup.writer.write(&path, b"first\n").unwrap();
    fs::rename(&path, &rotated).unwrap();

    let outcome = setup.writer.write(&path, b"second\n").unwrap();
    assert_eq!(outcome, WriteOutcome::Reopened);
    assert_eq!(fs::read_to_string(&rotated).unwrap(), "first\n");
    assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
    assert_eq!(
      list_files(setup.temp_dir.path()),
      vec!["app.log".to_string(), "app.log.1".to_string()]
    );
  }

  #[test]
  fn file_recreated_by_rotation_tool_is_adopted() {
    let mut setup = setup(OpenOptionsConfig::default());
    let path = setup.temp_dir.path().join("app.log");
    let rotated = setup.temp_dir.path().join("app.log.1");

    setup.writer.write(&path, b"first\n").unwrap();
    let old_identity = setup.writer.identity();
    fs::rename(&path, &rotated).unwrap();
    // logrotate's `create` directive puts an empty file back in place.
    fs::write(&path, "").unwrap();

    let outcome = setup.writer.write(&path, b"second\n").unwrap();
    assert_eq!(outcome, WriteOutcome::Reopened);
    assert_ne!(setup.writer.identity(), old_identity);
    assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
    assert_eq!(fs::read_to_string(&rotated).unwrap(), "first\n");
  }

  #[test]
  fn path_change_closes_old_file() {
    let mut setup = setup(OpenOptionsConfig::default());
    let day1 = setup.temp_dir.path().join("2024-03-05.log");
    let day2 = setup.temp_dir.path().join("2024-03-06.log");

    setup.writer.write(&day1, b"a\n").unwrap();
    let outcome = setup.writer.write(&day2, b"b\n").unwrap();

    assert_eq!(outcome, WriteOutcome::Reopened);
    assert_eq!(setup.writer.current_path(), Some(day2.as_path()));
    assert_eq!(fs::read_to_string(&day1).unwrap(), "a\n");
    assert_eq!(fs::read_to_string(&day2).unwrap(), "b\n");
  }

  #[test]
  fn failed_open_leaves_writer_closed_and_next_write_retries() {
    let mut setup = setup(OpenOptionsConfig::default());
    // A regular file where a directory is expected makes directory creation fail.
    let blocker = setup.temp_dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let bad_path = blocker.join("app.log");

    let err = setup.writer.write(&bad_path, b"lost\n").unwrap_err();
    assert!(matches!(err, Error::DirectoryCreate { .. }));
    assert!(!setup.writer.is_open());

    let good_path = setup.temp_dir.path().join("app.log");
    assert_eq!(
      setup.writer.write(&good_path, b"kept\n").unwrap(),
      WriteOutcome::Opened
    );
    assert_eq!(fs::read_to_string(&good_path).unwrap(), "kept\n");
  }

  #[test]
  fn opening_a_directory_fails_as_file_open() {
    let mut setup = setup(OpenOptionsConfig::default());
    let dir_path = setup.temp_dir.path().join("a_dir");
    fs::create_dir(&dir_path).unwrap();

    let err = setup.writer.write(&dir_path, b"x\n").unwrap_err();
    assert!(matches!(err, Error::FileOpen { .. }));
    assert!(!setup.writer.is_open());
  }

  // Every write to /dev/full fails with ENOSPC after a successful open.
  #[cfg(target_os = "linux")]
  #[test]
  fn failed_write_closes_writer_and_next_write_reopens() {
    let mut setup = setup(OpenOptionsConfig::default());
    let full = Path::new("/dev/full");

    let err = setup.writer.write(full, b"lost\n").unwrap_err();
    assert!(matches!(err, Error::Write { ref path, .. } if path == full));
    assert!(!setup.writer.is_open());
    assert_eq!(setup.writer.current_path(), Some(full));

    // Closed again, so the retry goes through a fresh open before failing.
    let err = setup.writer.write(full, b"lost again\n").unwrap_err();
    assert!(matches!(err, Error::Write { .. }));
    assert!(!setup.writer.is_open());

    let good_path = setup.temp_dir.path().join("app.log");
    assert_eq!(
      setup.writer.write(&good_path, b"kept\n").unwrap(),
      WriteOutcome::Opened
    );
    assert_eq!(fs::read_to_string(&good_path).unwrap(), "kept\n");
  }

  #[cfg(target_os = "linux")]
  #[test]
  fn failed_flush_of_delayed_writes_closes_writer() {
    let mut writer = RotatingFileWriter::new(OpenOptionsConfig {
      buffer_size: Some(4096),
      mode: None,
    });
    let full = Path::new("/dev/full");

    assert_eq!(writer.write(full, b"buffered\n").unwrap(), WriteOutcome::Opened);
    assert!(writer.is_open());

    let err = writer.flush().unwrap_err();
    assert!(matches!(err, Error::Write { .. }));
    assert!(!writer.is_open());
  }

  #[test]
  fn delayed_write_buffers_until_flush() {
    let mut setup = setup(OpenOptionsConfig {
      buffer_size: Some(1024),
      mode: None,
    });
    let path = setup.temp_dir.path().join("app.log");

    setup.writer.write(&path, b"buffered\n").unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);

    setup.writer.flush().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "buffered\n");
  }

  #[test]
  fn buffered_lines_follow_their_file_across_rotation() {
    let mut setup = setup(OpenOptionsConfig {
      buffer_size: Some(1024),
      mode: None,
    });
    let path = setup.temp_dir.path().join("app.log");
    let rotated = setup.temp_dir.path().join("app.log.1");

    setup.writer.write(&path, b"old\n").unwrap();
    fs::rename(&path, &rotated).unwrap();
    setup.writer.write(&path, b"new\n").unwrap();
    setup.writer.flush().unwrap();

    assert_eq!(fs::read_to_string(&rotated).unwrap(), "old\n");
    assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
  }

  #[cfg(unix)]
  #[test]
  fn new_files_get_configured_mode() {
    use std::os::unix::fs::PermissionsExt;

    let mut setup = setup(OpenOptionsConfig {
      buffer_size: None,
      mode: Some(0o600),
    });
    let path = setup.temp_dir.path().join("secret.log");
    setup.writer.write(&path, b"x\n").unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
  }

  #[test]
  fn drop_flushes_pending_bytes() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("app.log");
    {
      let mut writer = RotatingFileWriter::new(OpenOptionsConfig {
        buffer_size: Some(4096),
        mode: None,
      });
      writer.write(&path, b"pending\n").unwrap();
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), "pending\n");
  }
}
