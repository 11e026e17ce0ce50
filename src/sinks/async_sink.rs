//! Sink that hands records to an [`AsyncQueue`]
//!
//! The wrapped sink runs on the queue's consumer thread, so formatting and
//! I/O never happen on the producer. Several async sinks may share one
//! queue; each registers as a producer and the queue keeps its consumer
//! alive until the last of them is closed.

use crate::core::async_queue::{AsyncQueue, IdleHook, ProducerId};
use crate::core::error::{LoggerError, Result};
use crate::core::record::Record;
use crate::core::sink::{Sink, SinkOptions};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct AsyncSink {
    name: String,
    inner: Arc<dyn Sink>,
    queue: Arc<AsyncQueue>,
    producer: Mutex<Option<ProducerId>>,
    options: SinkOptions,
    closed: AtomicBool,
    /// Set once closing the inner sink has been queued behind our records
    handed_off: AtomicBool,
}

/// Flushes and closes the wrapped sink when dropped, so the inner sink is
/// closed whether the queue runs the task holding it or discards it.
struct CloseInner(Arc<dyn Sink>);

impl Drop for CloseInner {
    fn drop(&mut self) {
        self.0.flush();
        self.0.close();
    }
}

impl AsyncSink {
    pub const NAME: &'static str = "AsyncFileSink";

    /// Wrap `inner` and register with `queue`.
    ///
    /// The inner sink is flushed whenever the queue goes idle.
    pub fn new(inner: Arc<dyn Sink>, queue: Arc<AsyncQueue>) -> Result<Self> {
        Self::with_options(inner, queue, SinkOptions::default())
    }

    /// `options` filter on the producer side, before anything is queued
    pub fn with_options(
        inner: Arc<dyn Sink>,
        queue: Arc<AsyncQueue>,
        options: SinkOptions,
    ) -> Result<Self> {
        let flush_target = Arc::clone(&inner);
        let idle_flush: IdleHook = Arc::new(move || flush_target.flush());
        let producer = queue.register(Some(idle_flush))?;

        Ok(Self {
            name: Self::NAME.to_string(),
            inner,
            queue,
            producer: Mutex::new(Some(producer)),
            options,
            closed: AtomicBool::new(false),
            handed_off: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn queue(&self) -> &Arc<AsyncQueue> {
        &self.queue
    }

    pub fn inner(&self) -> &Arc<dyn Sink> {
        &self.inner
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Sink for AsyncSink {
    fn publish(&self, record: &Record) {
        if !self.options.is_loggable(record) {
            return;
        }
        // After close, only a draining queue still takes records, and only
        // while the inner sink is still open.
        if self.is_closed()
            && (self.handed_off.load(Ordering::Acquire) || !self.queue.is_terminating())
        {
            self.options
                .report(LoggerError::rejected(format!("{} is closed", self.name)));
            return;
        }

        let inner = Arc::clone(&self.inner);
        let record = record.clone();
        if let Err(e) = self.queue.submit(Box::new(move || inner.publish(&record))) {
            self.options.report(e);
        }
    }

    fn flush(&self) {
        if self.is_closed() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        if let Err(e) = self.queue.submit(Box::new(move || inner.flush())) {
            self.options.report(e);
        }
    }

    /// Deregister from the queue.
    ///
    /// The last producer waits for the drain and closes the wrapped sink
    /// itself. Any other producer leaves the consumer running, so closing
    /// the wrapped sink is queued behind the records it already submitted.
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(id) = self.producer.lock().take() else {
            return;
        };
        if self.queue.deregister(id) {
            self.inner.close();
            return;
        }

        self.handed_off.store(true, Ordering::Release);
        let guard = CloseInner(Arc::clone(&self.inner));
        // On rejection the guard is dropped here and closes inline; the
        // consumer has already drained everything.
        let _ = self.queue.submit_final(Box::new(move || drop(guard)));
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_async(&self) -> bool {
        true
    }
}

impl Drop for AsyncSink {
    fn drop(&mut self) {
        self.close();
    }
}
