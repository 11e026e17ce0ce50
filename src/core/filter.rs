//! Record filters attached to sinks

use super::record::Record;

/// Decides whether a sink accepts a record after the level check passed
pub trait Filter: Send + Sync {
    fn is_loggable(&self, record: &Record) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    fn is_loggable(&self, record: &Record) -> bool {
        self(record)
    }
}

/// Accepts only records whose logger name starts with one of the prefixes
#[derive(Debug, Clone)]
pub struct LoggerPrefixFilter {
    prefixes: Vec<String>,
}

impl LoggerPrefixFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Filter for LoggerPrefixFilter {
    fn is_loggable(&self, record: &Record) -> bool {
        let name = record.logger_name();
        self.prefixes.iter().any(|prefix| {
            name == prefix
                || (name.starts_with(prefix.as_str())
                    && name.as_bytes().get(prefix.len()) == Some(&b'.'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;

    #[test]
    fn test_closure_filter() {
        let filter = |record: &Record| !record.message().contains("secret");
        assert!(filter.is_loggable(&Record::new(LogLevel::Info, "a", "hello")));
        assert!(!filter.is_loggable(&Record::new(LogLevel::Info, "a", "secret token")));
    }

    #[test]
    fn test_prefix_filter_matches_whole_segments() {
        let filter = LoggerPrefixFilter::new(["db"]);
        assert!(filter.is_loggable(&Record::new(LogLevel::Info, "db", "x")));
        assert!(filter.is_loggable(&Record::new(LogLevel::Info, "db.pool", "x")));
        assert!(!filter.is_loggable(&Record::new(LogLevel::Info, "dbx", "x")));
        assert!(!filter.is_loggable(&Record::new(LogLevel::Info, "http", "x")));
    }
}
