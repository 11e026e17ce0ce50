//! Logging macros for ergonomic log message formatting.
//!
//! The macros format their arguments like `format!`, skip formatting when the
//! level is disabled, and attach the calling module and function as the
//! record's source location.
//!
//! # Examples
//!
//! ```
//! use rust_scoped_logger::core::Logger;
//! use rust_scoped_logger::info;
//!
//! let logger = Logger::new("server");
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Source location of the macro call site.
#[doc(hidden)]
#[macro_export]
macro_rules! __source_location {
    () => {{
        fn __here() {}
        $crate::core::SourceLocation::from_marker_path(
            ::std::any::type_name_of_val(&__here),
            ::std::line!(),
        )
    }};
}

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// use rust_scoped_logger::core::{LogLevel, Logger};
/// use rust_scoped_logger::log;
///
/// let logger = Logger::new("app");
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled(level) {
            logger.log_at(level, $crate::__source_location!(), ::std::format!($($arg)+));
        }
    }};
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// use rust_scoped_logger::core::Logger;
/// use rust_scoped_logger::info;
///
/// let logger = Logger::new("app");
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Fatal, $($arg)+)
    };
}
