//! # Rust Scoped Logger
//!
//! A hierarchical, multi-tenant logging runtime. Every execution context
//! (an application, a tenant, a request handler) gets its own logging scope
//! with its own configuration, logger tree and sinks, falling back to the
//! scope of its parent context.
//!
//! ## Features
//!
//! - **Context isolation**: scopes keyed by [`manager::ExecutionContext`],
//!   reclaimed when the context is dropped
//! - **Hierarchical loggers**: dot-delimited names with level and sink
//!   inheritance
//! - **Async sinks**: one bounded queue and consumer thread, four overflow
//!   policies, reference-counted shutdown with a bounded drain
//! - **Rotating files**: date-keyed rotation, retention and optional gzip
//!
//! ## Example
//!
//! ```
//! use rust_scoped_logger::prelude::*;
//!
//! let registry = ScopeRegistry::builder()
//!     .inline_config(".level = INFO\nsinks = ConsoleSink\n")
//!     .build()
//!     .unwrap();
//! registry.load_configuration();
//!
//! let tenant = ExecutionContext::new("tenant-a");
//! let logger = registry.get_logger(&tenant, "billing.invoices").unwrap();
//! rust_scoped_logger::info!(logger, "invoice {} issued", 42);
//!
//! registry.shutdown();
//! ```

pub mod core;
pub mod manager;
pub mod sinks;

mod macros;

pub mod prelude {
    pub use crate::core::{
        Clock, ErrorKind, ErrorReporter, Filter, Formatter, LevelFilter, LogLevel, Logger,
        LoggerError, OneLineFormatter, OverflowPolicy, Record, Result, Sink, SinkOptions,
    };
    pub use crate::manager::{ConfigSource, ExecutionContext, Plugins, ScopeRegistry};
    pub use crate::sinks::{AsyncSink, ConsoleSink, FileSinkConfig, RotatingFileSink};
}

pub use crate::core::{LogLevel, Logger, LoggerError, OverflowPolicy, Result};
pub use crate::manager::{ExecutionContext, LoggingScope, ScopeRegistry};
