//! Date-rotated file sink
//!
//! Writes go to `<directory>/<prefix><yyyy-MM-dd><suffix>`. Every write
//! computes the current date key; when it differs from the key of the open
//! file the sink takes the exclusive lock, re-checks, swaps files and then
//! downgrades to the shared lock for the write itself. Any number of
//! producers can therefore write concurrently while a date change triggers
//! exactly one close/open cycle.

use crate::core::clock::{Clock, SystemClock};
use crate::core::error::{LoggerError, Result};
use crate::core::record::Record;
use crate::core::sink::{Sink, SinkOptions};
use chrono::{Days, NaiveDate};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub const DEFAULT_DIRECTORY: &str = "logs";
pub const DEFAULT_PREFIX: &str = "app.";
pub const DEFAULT_SUFFIX: &str = ".log";

/// Date pattern embedded in file names
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

const COMPRESSED_EXTENSION: &str = ".gz";

/// File naming, rotation and retention settings
///
/// # Examples
///
/// ```
/// use rust_scoped_logger::sinks::FileSinkConfig;
///
/// let config = FileSinkConfig::new()
///     .with_directory("/var/log/myapp")
///     .with_prefix("catalina.")
///     .with_max_days(14)
///     .with_compression(true);
/// assert_eq!(config.max_days, 14);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkConfig {
    pub directory: PathBuf,
    pub prefix: String,
    pub suffix: String,
    /// Embed the date in the file name and rotate when it changes
    pub rotatable: bool,
    /// Keep files for this many days; negative disables retention
    pub max_days: i64,
    /// Output buffer in bytes; zero or negative flushes after every record
    pub buffer_size: i64,
    /// Gzip the file being closed on a date rotation
    pub compress: bool,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
            rotatable: true,
            max_days: -1,
            buffer_size: -1,
            compress: false,
        }
    }
}

impl FileSinkConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rotatable(mut self, rotatable: bool) -> Self {
        self.rotatable = rotatable;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_days(mut self, max_days: i64) -> Self {
        self.max_days = max_days;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_buffer_size(mut self, buffer_size: i64) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Path of the file for a rotation key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.directory
            .join(format!("{}{}{}", self.prefix, key, self.suffix))
    }

    /// Date embedded in `file_name`, if it follows this sink's naming pattern
    fn embedded_date(&self, file_name: &str) -> Option<NaiveDate> {
        let name = file_name
            .strip_suffix(COMPRESSED_EXTENSION)
            .unwrap_or(file_name);
        let date = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        NaiveDate::parse_from_str(date, DATE_KEY_FORMAT).ok()
    }
}

struct RotationState {
    /// Key of the open file; `None` until the first write and after close
    key: Option<String>,
    path: Option<PathBuf>,
    writer: Mutex<Option<BufWriter<File>>>,
}

pub struct RotatingFileSink {
    name: String,
    config: FileSinkConfig,
    options: SinkOptions,
    clock: Arc<dyn Clock>,
    state: RwLock<RotationState>,
    open_count: AtomicU64,
    close_count: AtomicU64,
    closed: AtomicBool,
}

impl RotatingFileSink {
    pub const NAME: &'static str = "FileSink";

    pub fn new(config: FileSinkConfig) -> Self {
        Self::with_options(config, SinkOptions::default())
    }

    pub fn with_options(config: FileSinkConfig, options: SinkOptions) -> Self {
        Self {
            name: Self::NAME.to_string(),
            config,
            options,
            clock: Arc::new(SystemClock),
            state: RwLock::new(RotationState {
                key: None,
                path: None,
                writer: Mutex::new(None),
            }),
            open_count: AtomicU64::new(0),
            close_count: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &FileSinkConfig {
        &self.config
    }

    /// Number of files opened so far
    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::Acquire)
    }

    /// Number of files closed so far
    pub fn close_count(&self) -> u64 {
        self.close_count.load(Ordering::Acquire)
    }

    /// Path of the file currently open, if any
    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.read().path.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn current_key(&self) -> String {
        if self.config.rotatable {
            self.clock.today().format(DATE_KEY_FORMAT).to_string()
        } else {
            String::new()
        }
    }

    /// Write already formatted text, rotating first if the date changed
    pub fn write_text(&self, text: &str) {
        if self.is_closed() {
            self.options.report(LoggerError::write_failure(
                self.name.as_str(),
                "sink is closed",
            ));
            return;
        }

        let key = self.current_key();
        let mut state = self.state.read();
        if state.key.as_deref() != Some(key.as_str()) {
            drop(state);
            let mut exclusive = self.state.write();
            // Another writer may have rotated, and the clock may have moved on.
            let key = self.current_key();
            if exclusive.key.as_deref() != Some(key.as_str()) {
                self.rotate(&mut exclusive, key);
            }
            state = RwLockWriteGuard::downgrade(exclusive);
        }

        let mut writer = state.writer.lock();
        let Some(out) = writer.as_mut() else {
            return;
        };

        let mut result = out.write_all(text.as_bytes());
        if result.is_ok() && self.config.buffer_size <= 0 {
            result = out.flush();
        }
        if let Err(e) = result {
            *writer = None;
            self.options.report(LoggerError::write_failure(
                self.name.as_str(),
                format!(
                    "{}: {}",
                    state
                        .path
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    e
                ),
            ));
        }
    }

    /// Close the open file and open the one for `key`. Requires the exclusive lock.
    fn rotate(&self, state: &mut RotationState, key: String) {
        if self.is_closed() {
            return;
        }

        self.close_current(state, self.config.compress && self.config.rotatable);

        let path = self.config.path_for(&key);
        state.key = Some(key);
        state.path = Some(path.clone());

        match self.open(&path) {
            Ok(writer) => {
                *state.writer.get_mut() = Some(writer);
                self.open_count.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => {
                self.options.report(e);
                return;
            }
        }

        self.clean_expired();
    }

    fn open(&self, path: &Path) -> Result<BufWriter<File>> {
        fs::create_dir_all(&self.config.directory)
            .map_err(|e| LoggerError::open_failure(self.config.directory.display().to_string(), e))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LoggerError::open_failure(path.display().to_string(), e))?;

        let mut writer = match usize::try_from(self.config.buffer_size) {
            Ok(capacity) if capacity > 0 => BufWriter::with_capacity(capacity, file),
            _ => BufWriter::new(file),
        };

        let head = self.options.formatter.head();
        if !head.is_empty() {
            writer
                .write_all(head.as_bytes())
                .and_then(|()| writer.flush())
                .map_err(|e| {
                    LoggerError::write_failure(path.display().to_string(), e.to_string())
                })?;
        }
        Ok(writer)
    }

    /// Flush, write the tail and drop the open file. Requires the exclusive lock.
    fn close_current(&self, state: &mut RotationState, compress: bool) {
        let Some(mut writer) = state.writer.get_mut().take() else {
            return;
        };

        let tail = self.options.formatter.tail();
        if !tail.is_empty() {
            if let Err(e) = writer.write_all(tail.as_bytes()) {
                self.options.report(LoggerError::close_failure(
                    self.name.as_str(),
                    format!("failed to write tail: {}", e),
                ));
            }
        }
        if let Err(e) = writer.flush() {
            self.options
                .report(LoggerError::flush_failure(self.name.as_str(), e));
        }
        drop(writer);
        self.close_count.fetch_add(1, Ordering::AcqRel);

        if compress {
            if let Some(path) = state.path.as_deref() {
                if let Err(e) = compress_file(path) {
                    self.options.report(e);
                }
            }
        }
    }

    /// Delete files of this sink whose embedded date is older than `today - max_days`
    fn clean_expired(&self) {
        if self.config.max_days < 0 || !self.config.rotatable {
            return;
        }
        let Some(cutoff) = self
            .clock
            .today()
            .checked_sub_days(Days::new(self.config.max_days.unsigned_abs()))
        else {
            return;
        };

        let entries = match fs::read_dir(&self.config.directory) {
            Ok(entries) => entries,
            Err(e) => {
                self.options.report(LoggerError::io_operation(
                    "retention",
                    format!(
                        "cannot list log directory '{}'",
                        self.config.directory.display()
                    ),
                    e,
                ));
                return;
            }
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(date) = file_name
                .to_str()
                .and_then(|name| self.config.embedded_date(name))
            else {
                continue;
            };
            if date >= cutoff {
                continue;
            }
            if let Err(e) = fs::remove_file(entry.path()) {
                self.options.report(LoggerError::io_operation(
                    "retention",
                    format!("failed to remove expired log '{}'", entry.path().display()),
                    e,
                ));
            }
        }
    }
}

/// Gzip `path` to `<path>.gz`, removing the original only on success
pub(crate) fn compress_file(path: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(COMPRESSED_EXTENSION);
    let gz_path = PathBuf::from(gz_name);
    let mut temp_name = gz_path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_gz_path = PathBuf::from(temp_name);

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_gz_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!(
                "Failed to create temporary compressed file: {}",
                temp_gz_path.display()
            ),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let mut buffer = vec![0u8; 64 * 1024];
    let streamed = loop {
        match reader.read(&mut buffer) {
            Ok(0) => break Ok(()),
            Ok(n) => {
                if let Err(e) = encoder.write_all(&buffer[..n]) {
                    break Err(e);
                }
            }
            Err(e) => break Err(e),
        }
    };

    let finished = streamed
        .and_then(|()| encoder.finish())
        .and_then(|mut out| out.flush());
    if let Err(e) = finished {
        let _ = fs::remove_file(&temp_gz_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    fs::rename(&temp_gz_path, &gz_path).map_err(|e| {
        let _ = fs::remove_file(&temp_gz_path);
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to rename compressed file to: {}", gz_path.display()),
            e,
        )
    })?;

    // Both versions remain if this fails; retention removes them later.
    fs::remove_file(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Compressed but could not remove {}", path.display()),
            e,
        )
    })
}

impl Sink for RotatingFileSink {
    fn publish(&self, record: &Record) {
        if !self.options.is_loggable(record) {
            return;
        }
        match self.options.formatter.format(record) {
            Ok(text) => self.write_text(&text),
            Err(e) => self.options.report(e),
        }
    }

    fn flush(&self) {
        let state = self.state.read();
        let mut writer = state.writer.lock();
        if let Some(out) = writer.as_mut() {
            if let Err(e) = out.flush() {
                self.options
                    .report(LoggerError::flush_failure(self.name.as_str(), e));
            }
        }
    }

    /// Final: later writes are reported and dropped
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut state = self.state.write();
        self.close_current(&mut state, false);
        state.key = None;
        state.path = None;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RotatingFileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFileSink")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("open_count", &self.open_count())
            .field("close_count", &self.close_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
