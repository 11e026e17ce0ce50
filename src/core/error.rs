//! Error types for the logger system

use std::fmt;

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Coarse classification used when an error is handed to an
/// [`ErrorReporter`](super::error_reporter::ErrorReporter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Generic,
    Configuration,
    Format,
    Open,
    Write,
    Flush,
    Close,
    Rejected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Generic => "GENERIC_FAILURE",
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
            ErrorKind::Format => "FORMAT_FAILURE",
            ErrorKind::Open => "OPEN_FAILURE",
            ErrorKind::Write => "WRITE_FAILURE",
            ErrorKind::Flush => "FLUSH_FAILURE",
            ErrorKind::Close => "CLOSE_FAILURE",
            ErrorKind::Rejected => "REJECTED_TASK",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration resource could not be read or parsed
    #[error("Configuration error in {resource}: {message}")]
    Configuration { resource: String, message: String },

    /// Invalid configuration with details (fails the calling operation)
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Logger name rejected by the namespace tree
    #[error("Invalid logger name '{name}': {reason}")]
    InvalidLoggerName { name: String, reason: String },

    /// Formatter error with formatter name
    #[error("Formatter error ({formatter}): {message}")]
    FormatFailure { formatter: String, message: String },

    /// Log file could not be opened
    #[error("Failed to open log file '{path}': {source}")]
    OpenFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be written
    #[error("Write failure for '{target}': {message}")]
    WriteFailure { target: String, message: String },

    /// Buffered output could not be flushed
    #[error("Flush failure for '{target}': {source}")]
    FlushFailure {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Log file could not be closed cleanly
    #[error("Failed to close '{target}': {message}")]
    CloseFailure { target: String, message: String },

    /// Async queue refused a task
    #[error("Task rejected by async queue: {reason}")]
    RejectedTask { reason: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a (non-fatal) configuration error
    pub fn configuration(resource: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Configuration {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn invalid_logger_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        LoggerError::InvalidLoggerName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a formatter error
    pub fn format_failure(formatter: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatFailure {
            formatter: formatter.into(),
            message: message.into(),
        }
    }

    pub fn open_failure(path: impl Into<String>, source: std::io::Error) -> Self {
        LoggerError::OpenFailure {
            path: path.into(),
            source,
        }
    }

    pub fn write_failure(target: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::WriteFailure {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn flush_failure(target: impl Into<String>, source: std::io::Error) -> Self {
        LoggerError::FlushFailure {
            target: target.into(),
            source,
        }
    }

    pub fn close_failure(target: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::CloseFailure {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        LoggerError::RejectedTask {
            reason: reason.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Classify this error for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoggerError::Configuration { .. }
            | LoggerError::InvalidConfiguration { .. }
            | LoggerError::InvalidLoggerName { .. } => ErrorKind::Configuration,
            LoggerError::FormatFailure { .. } => ErrorKind::Format,
            LoggerError::OpenFailure { .. } => ErrorKind::Open,
            LoggerError::WriteFailure { .. } => ErrorKind::Write,
            LoggerError::FlushFailure { .. } => ErrorKind::Flush,
            LoggerError::CloseFailure { .. } => ErrorKind::Close,
            LoggerError::RejectedTask { .. } => ErrorKind::Rejected,
            LoggerError::IoOperation { .. } | LoggerError::Other(_) => ErrorKind::Generic,
        }
    }
}
