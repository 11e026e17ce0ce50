//! Core logger types and traits

pub mod async_queue;
pub mod clock;
pub mod error;
pub mod error_reporter;
pub mod filter;
pub mod formatter;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod record;
pub mod sink;
pub mod thread_names;
pub mod timestamp;

pub use async_queue::{
    AsyncQueue, IdleHook, ProducerId, SubmitOutcome, Task, DEFAULT_QUEUE_CAPACITY, DRAIN_TIMEOUT,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, LoggerError, Result};
pub use error_reporter::{CollectingReporter, ErrorReporter, StderrReporter};
pub use filter::{Filter, LoggerPrefixFilter};
pub use formatter::{Formatter, OneLineFormatter, LINE_SEPARATOR};
pub use log_level::{LevelFilter, LogLevel};
pub use logger::{Logger, DEFAULT_LEVEL};
pub use metrics::QueueMetrics;
pub use overflow_policy::OverflowPolicy;
pub use record::{ErrorTrace, Record, SourceLocation};
pub use sink::{Sink, SinkOptions};
pub use thread_names::{current_thread_id, current_thread_name, THREAD_NAME_CACHE_SIZE};
pub use timestamp::TimestampFormat;
