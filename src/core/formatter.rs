//! Record formatters
//!
//! A formatter turns a [`Record`] into the exact text a sink writes,
//! including the trailing line terminator.

use super::error::Result;
use super::record::Record;
use super::thread_names::{current_thread_id, current_thread_name, resolve_thread_name};
use super::timestamp::TimestampFormat;

#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

pub trait Formatter: Send + Sync {
    fn format(&self, record: &Record) -> Result<String>;

    /// Text written when a file is opened
    fn head(&self) -> String {
        String::new()
    }

    /// Text written before a file is closed
    fn tail(&self) -> String {
        String::new()
    }

    fn name(&self) -> &str;
}

/// `<timestamp> <LEVEL> [<thread>] <class>.<method> <message>`
///
/// # Example
///
/// ```
/// use rust_scoped_logger::core::{Formatter, LogLevel, OneLineFormatter, Record};
///
/// let formatter = OneLineFormatter::new();
/// let line = formatter.format(&Record::new(LogLevel::Info, "app", "ready")).unwrap();
/// assert!(line.contains(" INFO ["));
/// assert!(line.ends_with("app ready\n") || line.ends_with("app ready\r\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OneLineFormatter {
    timestamp_format: TimestampFormat,
}

impl OneLineFormatter {
    pub const NAME: &'static str = "OneLineFormatter";

    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Name of the thread that created the record, looked up only when it
    /// is not the rendering thread
    fn thread_name(record: &Record) -> String {
        if record.thread_id() == current_thread_id() {
            current_thread_name()
        } else {
            resolve_thread_name(record.thread_id())
        }
    }
}

impl Formatter for OneLineFormatter {
    fn format(&self, record: &Record) -> Result<String> {
        let timestamp = self.timestamp_format.format(record.timestamp())?;

        let mut out = String::with_capacity(96 + record.message().len());
        out.push_str(&timestamp);
        out.push(' ');
        out.push_str(record.level().to_str());
        out.push_str(" [");
        out.push_str(&Self::thread_name(record));
        out.push_str("] ");

        match record.source() {
            Some(source) if !source.method.is_empty() => {
                out.push_str(&source.class);
                out.push('.');
                out.push_str(&source.method);
            }
            Some(source) => out.push_str(&source.class),
            None => out.push_str(record.logger_name()),
        }

        out.push(' ');
        out.push_str(record.message());
        out.push_str(LINE_SEPARATOR);

        if let Some(trace) = record.error() {
            out.push_str("Error: ");
            out.push_str(&trace.message);
            out.push_str(LINE_SEPARATOR);
            for cause in &trace.causes {
                out.push_str("Caused by: ");
                out.push_str(cause);
                out.push_str(LINE_SEPARATOR);
            }
        }

        Ok(out)
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
