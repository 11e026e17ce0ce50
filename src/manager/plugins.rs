//! Factory registry for sinks, formatters and filters named in configuration
//!
//! Configuration names sinks by identifier: `[<digits><label>.]<Kind>`, e.g.
//! `ConsoleSink` or `1catalina.FileSink`. A leading digit marks a labelled
//! instance whose kind is the text after the first dot. Per-sink keys are
//! read as `<identifier>.<key>`.

use super::properties::Properties;
use crate::core::async_queue::AsyncQueue;
use crate::core::clock::{Clock, SystemClock};
use crate::core::error::{LoggerError, Result};
use crate::core::error_reporter::ErrorReporter;
use crate::core::filter::{Filter, LoggerPrefixFilter};
use crate::core::formatter::{Formatter, OneLineFormatter};
use crate::core::log_level::LevelFilter;
use crate::core::overflow_policy::OverflowPolicy;
use crate::core::sink::{Sink, SinkOptions};
use crate::core::timestamp::TimestampFormat;
use crate::sinks::{AsyncSink, ConsoleSink, FileSinkConfig, RotatingFileSink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub type SinkFactory = Arc<dyn Fn(&BuildContext<'_>) -> Result<Arc<dyn Sink>> + Send + Sync>;
pub type FormatterFactory =
    Arc<dyn Fn(&SinkSettings<'_>) -> Result<Arc<dyn Formatter>> + Send + Sync>;
pub type FilterFactory = Arc<dyn Fn(&SinkSettings<'_>) -> Result<Arc<dyn Filter>> + Send + Sync>;

/// The kind part of a sink identifier
pub fn sink_kind(id: &str) -> &str {
    if id.starts_with(|c: char| c.is_ascii_digit()) {
        if let Some((_, kind)) = id.split_once('.') {
            return kind;
        }
    }
    id
}

/// View of the `<identifier>.*` keys of one sink
#[derive(Debug, Clone, Copy)]
pub struct SinkSettings<'a> {
    id: &'a str,
    properties: &'a Properties,
}

impl<'a> SinkSettings<'a> {
    pub fn new(id: &'a str, properties: &'a Properties) -> Self {
        Self { id, properties }
    }

    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.properties
            .get(&format!("{}.{}", self.id, key))
            .map(str::trim)
    }

    pub fn get_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }
}

/// One process-wide queue shared by every async sink, created on first use
pub struct SharedQueue {
    capacity: usize,
    policy: OverflowPolicy,
    reporter: Arc<dyn ErrorReporter>,
    queue: Mutex<Option<Arc<AsyncQueue>>>,
}

impl SharedQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            capacity,
            policy,
            reporter,
            queue: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Result<Arc<AsyncQueue>> {
        let mut slot = self.queue.lock();
        if let Some(queue) = slot.as_ref() {
            return Ok(Arc::clone(queue));
        }
        let queue =
            AsyncQueue::with_reporter(self.capacity, self.policy, Arc::clone(&self.reporter))?;
        *slot = Some(Arc::clone(&queue));
        Ok(queue)
    }

    /// The queue, if any async sink has been built
    pub fn existing(&self) -> Option<Arc<AsyncQueue>> {
        self.queue.lock().clone()
    }
}

/// Everything a sink factory may need
pub struct BuildContext<'a> {
    pub settings: SinkSettings<'a>,
    pub plugins: &'a Plugins,
    pub queue: &'a SharedQueue,
    pub reporter: Arc<dyn ErrorReporter>,
    pub clock: Arc<dyn Clock>,
}

impl BuildContext<'_> {
    /// Level, filter and formatter from the sink's keys
    pub fn sink_options(&self) -> Result<SinkOptions> {
        self.plugins.sink_options(&self.settings, Arc::clone(&self.reporter))
    }
}

#[derive(Clone)]
pub struct Plugins {
    sinks: HashMap<String, SinkFactory>,
    formatters: HashMap<String, FormatterFactory>,
    filters: HashMap<String, FilterFactory>,
    clock: Arc<dyn Clock>,
}

impl Default for Plugins {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Plugins {
    /// A registry with nothing registered
    pub fn empty() -> Self {
        Self {
            sinks: HashMap::new(),
            formatters: HashMap::new(),
            filters: HashMap::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// `ConsoleSink`, `FileSink`, `AsyncFileSink`, `OneLineFormatter` and
    /// `LoggerPrefixFilter`
    pub fn with_builtins() -> Self {
        let mut plugins = Self::empty();
        plugins.register_sink(ConsoleSink::NAME, Arc::new(build_console_sink));
        plugins.register_sink(RotatingFileSink::NAME, Arc::new(build_file_sink));
        plugins.register_sink(AsyncSink::NAME, Arc::new(build_async_file_sink));
        plugins.register_formatter(OneLineFormatter::NAME, Arc::new(build_one_line_formatter));
        plugins.register_filter("LoggerPrefixFilter", Arc::new(build_prefix_filter));
        plugins
    }

    pub fn register_sink(&mut self, kind: impl Into<String>, factory: SinkFactory) {
        self.sinks.insert(kind.into(), factory);
    }

    pub fn register_formatter(&mut self, name: impl Into<String>, factory: FormatterFactory) {
        self.formatters.insert(name.into(), factory);
    }

    pub fn register_filter(&mut self, name: impl Into<String>, factory: FilterFactory) {
        self.filters.insert(name.into(), factory);
    }

    /// Date source handed to file sinks
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn has_sink_kind(&self, kind: &str) -> bool {
        self.sinks.contains_key(kind)
    }

    pub fn build_sink(
        &self,
        id: &str,
        properties: &Properties,
        queue: &SharedQueue,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Arc<dyn Sink>> {
        let kind = sink_kind(id);
        let factory = self.sinks.get(kind).ok_or_else(|| {
            LoggerError::configuration(id, format!("unknown sink kind '{}'", kind))
        })?;
        factory(&BuildContext {
            settings: SinkSettings::new(id, properties),
            plugins: self,
            queue,
            reporter,
            clock: self.clock(),
        })
    }

    pub fn build_formatter(
        &self,
        name: &str,
        settings: &SinkSettings<'_>,
    ) -> Result<Arc<dyn Formatter>> {
        let factory = self.formatters.get(name).ok_or_else(|| {
            LoggerError::configuration(settings.id(), format!("unknown formatter '{}'", name))
        })?;
        factory(settings)
    }

    pub fn build_filter(&self, name: &str, settings: &SinkSettings<'_>) -> Result<Arc<dyn Filter>> {
        let factory = self.filters.get(name).ok_or_else(|| {
            LoggerError::configuration(settings.id(), format!("unknown filter '{}'", name))
        })?;
        factory(settings)
    }

    /// Read `level`, `filter`, `formatter` and `encoding` for a sink.
    ///
    /// Invalid values are reported and replaced by defaults; a sink with a
    /// bad level still logs.
    pub fn sink_options(
        &self,
        settings: &SinkSettings<'_>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<SinkOptions> {
        let mut options = SinkOptions::new().with_reporter(Arc::clone(&reporter));

        if let Some(level) = settings.get("level") {
            match level.parse::<LevelFilter>() {
                Ok(level) => options = options.with_level(level),
                Err(message) => {
                    reporter.report(&LoggerError::configuration(settings.id(), message))
                }
            }
        }

        if let Some(encoding) = settings.get("encoding") {
            let normalized = encoding.replace('-', "").to_ascii_lowercase();
            if normalized != "utf8" {
                reporter.report(&LoggerError::configuration(
                    settings.id(),
                    format!("unsupported encoding '{}', using UTF-8", encoding),
                ));
            }
        }

        if let Some(name) = settings.get("filter").filter(|name| !name.is_empty()) {
            options = options.with_filter(self.build_filter(name, settings)?);
        }

        let formatter_name = settings
            .get("formatter")
            .filter(|name| !name.is_empty())
            .unwrap_or(OneLineFormatter::NAME);
        options = options.with_formatter(self.build_formatter(formatter_name, settings)?);

        Ok(options)
    }
}

impl std::fmt::Debug for Plugins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sinks: Vec<&String> = self.sinks.keys().collect();
        sinks.sort();
        let mut formatters: Vec<&String> = self.formatters.keys().collect();
        formatters.sort();
        let mut filters: Vec<&String> = self.filters.keys().collect();
        filters.sort();
        f.debug_struct("Plugins")
            .field("sinks", &sinks)
            .field("formatters", &formatters)
            .field("filters", &filters)
            .finish()
    }
}

fn build_console_sink(ctx: &BuildContext<'_>) -> Result<Arc<dyn Sink>> {
    let sink = ConsoleSink::with_options(ctx.sink_options()?)
        .with_name(ctx.settings.id())
        .with_colors(ctx.settings.get_or("colors", true));
    Ok(Arc::new(sink))
}

/// File naming and retention keys shared by `FileSink` and `AsyncFileSink`
pub fn file_sink_config(settings: &SinkSettings<'_>) -> FileSinkConfig {
    let defaults = FileSinkConfig::default();
    FileSinkConfig {
        directory: settings
            .get("directory")
            .map(Into::into)
            .unwrap_or(defaults.directory),
        prefix: settings
            .get("prefix")
            .map(String::from)
            .unwrap_or(defaults.prefix),
        suffix: settings
            .get("suffix")
            .map(String::from)
            .unwrap_or(defaults.suffix),
        rotatable: settings.get_or("rotatable", defaults.rotatable),
        max_days: settings.get_or("maxDays", defaults.max_days),
        buffer_size: settings.get_or("bufferSize", defaults.buffer_size),
        compress: settings.get_or("compress", defaults.compress),
    }
}

fn build_file_sink(ctx: &BuildContext<'_>) -> Result<Arc<dyn Sink>> {
    let sink = RotatingFileSink::with_options(file_sink_config(&ctx.settings), ctx.sink_options()?)
        .with_name(ctx.settings.id())
        .with_clock(Arc::clone(&ctx.clock));
    Ok(Arc::new(sink))
}

fn build_async_file_sink(ctx: &BuildContext<'_>) -> Result<Arc<dyn Sink>> {
    let file = RotatingFileSink::with_options(file_sink_config(&ctx.settings), ctx.sink_options()?)
        .with_name(ctx.settings.id())
        .with_clock(Arc::clone(&ctx.clock));
    let options = SinkOptions::new().with_reporter(Arc::clone(&ctx.reporter));
    let sink = AsyncSink::with_options(Arc::new(file), ctx.queue.get()?, options)?
        .with_name(ctx.settings.id());
    Ok(Arc::new(sink))
}

fn build_one_line_formatter(settings: &SinkSettings<'_>) -> Result<Arc<dyn Formatter>> {
    let mut formatter = OneLineFormatter::new();
    if let Some(pattern) = settings.get("timestampFormat") {
        formatter = formatter.with_timestamp_format(pattern.parse::<TimestampFormat>()?);
    }
    Ok(Arc::new(formatter))
}

fn build_prefix_filter(settings: &SinkSettings<'_>) -> Result<Arc<dyn Filter>> {
    let prefixes = settings.get("prefixes").ok_or_else(|| {
        LoggerError::configuration(settings.id(), "LoggerPrefixFilter needs a 'prefixes' key")
    })?;
    Ok(Arc::new(LoggerPrefixFilter::new(super::properties::split_list(
        prefixes,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::error_reporter::CollectingReporter;
    use crate::core::log_level::LogLevel;
    use crate::core::record::Record;

    fn shared_queue(reporter: Arc<dyn ErrorReporter>) -> SharedQueue {
        SharedQueue::new(128, OverflowPolicy::BlockUntilSpace, reporter)
    }

    #[test]
    fn test_sink_kind() {
        assert_eq!(sink_kind("ConsoleSink"), "ConsoleSink");
        assert_eq!(sink_kind("1catalina.FileSink"), "FileSink");
        assert_eq!(sink_kind("22access.AsyncFileSink"), "AsyncFileSink");
        assert_eq!(sink_kind("com.example.Custom"), "com.example.Custom");
    }

    #[test]
    fn test_settings_are_namespaced_by_identifier() {
        let props: Properties = "1a.FileSink.prefix = a.\n1b.FileSink.prefix = b.\n"
            .parse()
            .unwrap();
        let a = SinkSettings::new("1a.FileSink", &props);
        assert_eq!(a.get("prefix"), Some("a."));
        assert_eq!(file_sink_config(&a).prefix, "a.");
        assert_eq!(file_sink_config(&a).suffix, ".log");
    }

    #[test]
    fn test_build_file_sink_from_properties() {
        let dir = tempfile::TempDir::new().unwrap();
        let reporter = CollectingReporter::new();
        let text = format!(
            "1app.FileSink.directory = {}\n\
             1app.FileSink.prefix = service.\n\
             1app.FileSink.level = WARNING\n",
            dir.path().display()
        );
        let props: Properties = text.parse().unwrap();
        let queue = shared_queue(reporter.clone());

        let sink = Plugins::with_builtins()
            .build_sink("1app.FileSink", &props, &queue, reporter.clone())
            .unwrap();
        assert_eq!(sink.name(), "1app.FileSink");

        sink.publish(&Record::new(LogLevel::Info, "svc", "too quiet"));
        sink.publish(&Record::new(LogLevel::Warn, "svc", "loud enough"));
        sink.close();

        let file = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .find(|e| e.file_name().to_string_lossy().starts_with("service."))
            .unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("loud enough"));
        assert!(!contents.contains("too quiet"));
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_async_file_sink_reports_through_registry_reporter() {
        let dir = tempfile::TempDir::new().unwrap();
        let reporter = CollectingReporter::new();
        let text = format!(
            "2bg.AsyncFileSink.directory = {}\n2bg.AsyncFileSink.prefix = background.\n",
            dir.path().display()
        );
        let props: Properties = text.parse().unwrap();
        let queue = shared_queue(reporter.clone());

        let sink = Plugins::with_builtins()
            .build_sink("2bg.AsyncFileSink", &props, &queue, reporter.clone())
            .unwrap();
        assert!(sink.is_async());
        sink.publish(&Record::new(LogLevel::Info, "svc", "written"));
        sink.close();
        assert!(queue.existing().unwrap().is_terminated());
        assert!(reporter.is_empty());

        sink.publish(&Record::new(LogLevel::Info, "svc", "after shutdown"));
        assert_eq!(reporter.count(ErrorKind::Rejected), 1);
    }

    #[test]
    fn test_unknown_kind_is_configuration_error() {
        let reporter = CollectingReporter::new();
        let props = Properties::new();
        let err = Plugins::with_builtins()
            .build_sink("SyslogSink", &props, &shared_queue(reporter.clone()), reporter)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_bad_level_and_encoding_are_reported_not_fatal() {
        let reporter = CollectingReporter::new();
        let props: Properties = "ConsoleSink.level = LOUD\nConsoleSink.encoding = ISO-8859-1\n"
            .parse()
            .unwrap();
        let options = Plugins::with_builtins()
            .sink_options(&SinkSettings::new("ConsoleSink", &props), reporter.clone())
            .unwrap();

        assert_eq!(options.level, LevelFilter::All);
        assert_eq!(reporter.count(ErrorKind::Configuration), 2);
    }

    #[test]
    fn test_registered_filter_is_applied() {
        let reporter = CollectingReporter::new();
        let props: Properties = "ConsoleSink.filter = LoggerPrefixFilter\nConsoleSink.prefixes = db, cache\n"
            .parse()
            .unwrap();
        let options = Plugins::with_builtins()
            .sink_options(&SinkSettings::new("ConsoleSink", &props), reporter)
            .unwrap();

        assert!(options.is_loggable(&Record::new(LogLevel::Info, "db.pool", "x")));
        assert!(!options.is_loggable(&Record::new(LogLevel::Info, "http", "x")));
    }

    #[test]
    fn test_custom_sink_kind() {
        struct Null;
        impl Sink for Null {
            fn publish(&self, _: &Record) {}
            fn flush(&self) {}
            fn close(&self) {}
            fn name(&self) -> &str {
                "null"
            }
        }

        let mut plugins = Plugins::with_builtins();
        plugins.register_sink(
            "NullSink",
            Arc::new(|_ctx: &BuildContext<'_>| -> Result<Arc<dyn Sink>> { Ok(Arc::new(Null)) }),
        );
        let reporter = CollectingReporter::new();
        let sink = plugins
            .build_sink("3quiet.NullSink", &Properties::new(), &shared_queue(reporter.clone()), reporter)
            .unwrap();
        assert_eq!(sink.name(), "null");
    }

    #[test]
    fn test_invalid_timestamp_format_fails_build() {
        let reporter = CollectingReporter::new();
        let props: Properties = "ConsoleSink.timestampFormat = %Q\n".parse().unwrap();
        let result = Plugins::with_builtins()
            .sink_options(&SinkSettings::new("ConsoleSink", &props), reporter);
        assert!(result.is_err());
    }
}
