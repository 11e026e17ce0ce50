//! Sink implementations

pub mod async_sink;
pub mod console;
pub mod rotating_file;

pub use async_sink::AsyncSink;
pub use console::ConsoleSink;
pub use rotating_file::{FileSinkConfig, RotatingFileSink};

// Re-export the trait next to its implementations
pub use crate::core::Sink;
