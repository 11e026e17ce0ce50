//! Named logger bound into a scope's namespace tree

use super::{
    log_level::{LevelFilter, LogLevel},
    record::{Record, SourceLocation},
    sink::Sink,
};
use parking_lot::RwLock;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Level used when neither a logger nor any of its ancestors sets one
pub const DEFAULT_LEVEL: LogLevel = LogLevel::Info;

/// A named emitter.
///
/// A logger has an optional level of its own, a resolved parent logger and
/// a list of sinks. Records pass the level check once, against the
/// effective level, and are then handed to this logger's sinks and, while
/// `use_parent_sinks` holds, to the sinks of each ancestor in turn.
pub struct Logger {
    name: String,
    level: RwLock<Option<LevelFilter>>,
    parent: RwLock<Option<Arc<Logger>>>,
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
    use_parent_sinks: AtomicBool,
}

impl Logger {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: RwLock::new(None),
            parent: RwLock::new(None),
            sinks: RwLock::new(Vec::new()),
            use_parent_sinks: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The level set on this logger, if any
    pub fn level(&self) -> Option<LevelFilter> {
        *self.level.read()
    }

    pub fn set_level(&self, level: Option<LevelFilter>) {
        *self.level.write() = level;
    }

    /// This logger's level, else the nearest ancestor's, else [`DEFAULT_LEVEL`]
    pub fn effective_level(&self) -> LevelFilter {
        if let Some(level) = self.level() {
            return level;
        }
        let mut current = self.parent();
        while let Some(logger) = current {
            if let Some(level) = logger.level() {
                return level;
            }
            current = logger.parent();
        }
        LevelFilter::Level(DEFAULT_LEVEL)
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.effective_level().allows(level)
    }

    pub fn parent(&self) -> Option<Arc<Logger>> {
        self.parent.read().clone()
    }

    pub fn set_parent(&self, parent: Option<Arc<Logger>>) {
        *self.parent.write() = parent;
    }

    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.sinks.write().push(sink);
    }

    /// Detach every sink with the given name, returning how many were removed
    pub fn remove_sink(&self, name: &str) -> usize {
        let mut sinks = self.sinks.write();
        let before = sinks.len();
        sinks.retain(|sink| sink.name() != name);
        before - sinks.len()
    }

    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.sinks.read().clone()
    }

    pub fn use_parent_sinks(&self) -> bool {
        self.use_parent_sinks.load(Ordering::Acquire)
    }

    pub fn set_use_parent_sinks(&self, enabled: bool) {
        self.use_parent_sinks.store(enabled, Ordering::Release);
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        if !self.is_enabled(level) {
            return;
        }
        self.dispatch(&Record::new(level, self.name.as_str(), message));
    }

    /// Emit with a caller-supplied source location, as the logging macros do
    pub fn log_at(&self, level: LogLevel, source: SourceLocation, message: impl AsRef<str>) {
        if !self.is_enabled(level) {
            return;
        }
        self.dispatch(&Record::new(level, self.name.as_str(), message).with_source(source));
    }

    pub fn log_error(
        &self,
        level: LogLevel,
        message: impl AsRef<str>,
        error: &(dyn StdError + 'static),
    ) {
        if !self.is_enabled(level) {
            return;
        }
        self.dispatch(&Record::new(level, self.name.as_str(), message).with_error(error));
    }

    /// Emit a fully built record, checking only its level
    pub fn log_record(&self, record: &Record) {
        if self.is_enabled(record.level()) {
            self.dispatch(record);
        }
    }

    fn dispatch(&self, record: &Record) {
        for sink in self.sinks.read().iter() {
            sink.publish(record);
        }
        if !self.use_parent_sinks() {
            return;
        }

        let mut current = self.parent();
        while let Some(logger) = current {
            for sink in logger.sinks.read().iter() {
                sink.publish(record);
            }
            if !logger.use_parent_sinks() {
                break;
            }
            current = logger.parent();
        }
    }

    /// Flush this logger's own sinks
    pub fn flush(&self) {
        for sink in self.sinks.read().iter() {
            sink.flush();
        }
    }

    pub fn trace(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    pub fn fatal(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Fatal, message);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("parent", &self.parent().map(|p| p.name.clone()))
            .field("sinks", &self.sinks.read().len())
            .field("use_parent_sinks", &self.use_parent_sinks())
            .finish()
    }
}
