//! Pluggable reporting of failures that must not reach the caller
//!
//! Sinks, the async queue and scope construction never propagate their I/O,
//! format or configuration failures to the code that emitted a record.
//! They hand them to an [`ErrorReporter`] instead.

use super::error::{ErrorKind, LoggerError};
use parking_lot::Mutex;
use std::sync::Arc;

pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &LoggerError);
}

/// Default reporter: one line per failure on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl ErrorReporter for StderrReporter {
    fn report(&self, error: &LoggerError) {
        eprintln!("[LOGGER ERROR] {}: {}", error.kind(), error);
    }
}

/// Reporter that keeps the rendered failures in memory.
///
/// Useful for tests and for hosts that surface logging failures
/// through their own health endpoints.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    entries: Mutex<Vec<(ErrorKind, String)>>,
}

impl CollectingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<(ErrorKind, String)> {
        self.entries.lock().clone()
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.entries.lock().iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, error: &LoggerError) {
        self.entries.lock().push((error.kind(), error.to_string()));
    }
}

pub(crate) fn default_reporter() -> Arc<dyn ErrorReporter> {
    Arc::new(StderrReporter)
}
