//! Immutable log record

use super::log_level::LogLevel;
use super::thread_names::current_thread_id;
use chrono::{DateTime, Local};
use std::error::Error as StdError;

/// Best-effort origin of a record: the module path plays the role of the
/// source class, the enclosing function that of the source method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub class: String,
    pub method: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(class: impl Into<String>, method: impl Into<String>, line: u32) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            line,
        }
    }

    /// Build a location from the type name of a marker function nested in
    /// the caller, e.g. `my_app::db::connect::__here`.
    pub fn from_marker_path(path: &str, line: u32) -> Self {
        let mut path = path.strip_suffix("::__here").unwrap_or(path);
        while let Some(outer) = path.strip_suffix("::{{closure}}") {
            path = outer;
        }
        match path.rsplit_once("::") {
            Some((class, method)) => Self::new(class, method, line),
            None => Self::new(path, "", line),
        }
    }
}

/// Rendered chain of an error attached to a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTrace {
    pub message: String,
    pub causes: Vec<String>,
}

impl ErrorTrace {
    pub fn capture(error: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            causes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    timestamp: DateTime<Local>,
    level: LogLevel,
    logger_name: String,
    message: String,
    thread_id: u64,
    source: Option<SourceLocation>,
    error: Option<ErrorTrace>,
}

impl Record {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// so that a record always occupies a single line.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: LogLevel, logger_name: impl Into<String>, message: impl AsRef<str>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            logger_name: logger_name.into(),
            message: Self::sanitize_message(message.as_ref()),
            thread_id: current_thread_id(),
            source: None,
            error: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: &(dyn StdError + 'static)) -> Self {
        self.error = Some(ErrorTrace::capture(error));
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    pub fn source(&self) -> Option<&SourceLocation> {
        self.source.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorTrace> {
        self.error.as_ref()
    }
}
