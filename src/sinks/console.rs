//! Console sink implementation

use crate::core::error::LoggerError;
use crate::core::log_level::LogLevel;
use crate::core::record::Record;
use crate::core::sink::{Sink, SinkOptions};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::{self, Write};

pub struct ConsoleSink {
    name: String,
    options: SinkOptions,
    use_colors: bool,
}

impl ConsoleSink {
    pub const NAME: &'static str = "ConsoleSink";

    pub fn new() -> Self {
        Self::with_options(SinkOptions::default())
    }

    pub fn with_options(options: SinkOptions) -> Self {
        Self {
            name: Self::NAME.to_string(),
            options,
            use_colors: cfg!(feature = "console"),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Colour the level token. Has no effect without the `console` feature.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors && cfg!(feature = "console");
        self
    }

    #[cfg(feature = "console")]
    fn colorize(&self, line: String, level: LogLevel) -> String {
        if !self.use_colors {
            return line;
        }
        let token = format!(" {} ", level.to_str());
        match line.find(&token) {
            Some(pos) => format!(
                "{} {} {}",
                &line[..pos],
                level.to_str().color(level.color_code()),
                &line[pos + token.len()..]
            ),
            None => line,
        }
    }

    #[cfg(not(feature = "console"))]
    fn colorize(&self, line: String, _level: LogLevel) -> String {
        line
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn publish(&self, record: &Record) {
        if !self.options.is_loggable(record) {
            return;
        }
        let line = match self.options.formatter.format(record) {
            Ok(line) => self.colorize(line, record.level()),
            Err(e) => {
                self.options.report(e);
                return;
            }
        };

        // Route Error and Fatal levels to stderr, others to stdout
        let result = match record.level() {
            LogLevel::Error | LogLevel::Fatal => io::stderr().lock().write_all(line.as_bytes()),
            _ => io::stdout().lock().write_all(line.as_bytes()),
        };
        if let Err(e) = result {
            self.options
                .report(LoggerError::write_failure(self.name.as_str(), e.to_string()));
        }
    }

    fn flush(&self) {
        // Flush both stdout and stderr since we write to both
        if let Err(e) = io::stdout().flush().and_then(|()| io::stderr().flush()) {
            self.options
                .report(LoggerError::flush_failure(self.name.as_str(), e));
        }
    }

    fn close(&self) {
        self.flush();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LevelFilter;

    #[test]
    fn test_console_sink_publishes_without_panicking() {
        let sink = ConsoleSink::new().with_colors(false);
        sink.publish(&Record::new(LogLevel::Info, "console", "to stdout"));
        sink.publish(&Record::new(LogLevel::Error, "console", "to stderr"));
        sink.flush();
        assert_eq!(sink.name(), ConsoleSink::NAME);
    }

    #[test]
    fn test_level_respected() {
        let sink = ConsoleSink::with_options(
            SinkOptions::new().with_level(LevelFilter::Off),
        );
        assert!(!sink.options.is_loggable(&Record::new(LogLevel::Fatal, "c", "x")));
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_colorize_keeps_text() {
        colored::control::set_override(false);
        let sink = ConsoleSink::new();
        let line = sink.colorize("ts WARN [main] app msg\n".to_string(), LogLevel::Warn);
        assert_eq!(line, "ts WARN [main] app msg\n");
    }
}
