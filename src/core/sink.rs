//! Sink trait for log output destinations

use super::error::LoggerError;
use super::error_reporter::{default_reporter, ErrorReporter};
use super::filter::Filter;
use super::formatter::{Formatter, OneLineFormatter};
use super::log_level::LevelFilter;
use super::record::Record;
use std::sync::Arc;

/// Destination for records.
///
/// Sinks are shared between loggers (and scopes) behind an `Arc`, so every
/// method takes `&self`. Failures never propagate to the caller; they go to
/// the sink's [`ErrorReporter`].
pub trait Sink: Send + Sync {
    fn publish(&self, record: &Record);
    fn flush(&self);
    fn close(&self);
    fn name(&self) -> &str;

    /// True for sinks that hand records to a background consumer
    fn is_async(&self) -> bool {
        false
    }
}

/// Level, filter, formatter and reporter shared by the concrete sinks
#[derive(Clone)]
pub struct SinkOptions {
    pub level: LevelFilter,
    pub filter: Option<Arc<dyn Filter>>,
    pub formatter: Arc<dyn Formatter>,
    pub reporter: Arc<dyn ErrorReporter>,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            level: LevelFilter::All,
            filter: None,
            formatter: Arc::new(OneLineFormatter::new()),
            reporter: default_reporter(),
        }
    }
}

impl SinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn is_loggable(&self, record: &Record) -> bool {
        self.level.allows(record.level())
            && self
                .filter
                .as_ref()
                .map_or(true, |filter| filter.is_loggable(record))
    }

    #[inline]
    pub fn report(&self, error: LoggerError) {
        self.reporter.report(&error);
    }
}

impl std::fmt::Debug for SinkOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkOptions")
            .field("level", &self.level)
            .field("filter", &self.filter.is_some())
            .field("formatter", &self.formatter.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;

    #[test]
    fn test_level_and_filter_combine() {
        let options = SinkOptions::new()
            .with_level(LevelFilter::Level(LogLevel::Info))
            .with_filter(Arc::new(|record: &Record| record.logger_name() != "noisy"));

        assert!(options.is_loggable(&Record::new(LogLevel::Warn, "app", "x")));
        assert!(!options.is_loggable(&Record::new(LogLevel::Debug, "app", "x")));
        assert!(!options.is_loggable(&Record::new(LogLevel::Error, "noisy", "x")));
    }
}
