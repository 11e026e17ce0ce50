//! Bounded single-consumer write queue
//!
//! Producers hand closures to the queue and return immediately; one
//! dedicated consumer thread runs them in submission order. When the queue
//! is full the configured [`OverflowPolicy`] decides what gives way.
//!
//! Several producers may share one queue. The consumer is started by the
//! first [`AsyncQueue::register`] and stops only when the last producer
//! calls [`AsyncQueue::deregister`]. That call drains the queue for at most
//! the drain timeout ([`DRAIN_TIMEOUT`] unless configured otherwise) and then
//! terminates the consumer by force.

use super::error::{LoggerError, Result};
use super::error_reporter::{default_reporter, ErrorReporter};
use super::metrics::QueueMetrics;
use super::overflow_policy::OverflowPolicy;
use super::thread_names::CONSUMER_THREAD_PREFIX;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Invoked by the consumer after [`IDLE_INTERVAL`] without work
pub type IdleHook = Arc<dyn Fn() + Send + Sync>;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default upper bound on the drain performed by the last deregistration
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub const IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Length of one wait under [`OverflowPolicy::BlockUntilSpace`]
pub const BLOCK_SLICE: Duration = Duration::from_secs(1);

static NEXT_CONSUMER: AtomicU64 = AtomicU64::new(1);

/// What happened to a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// Queued after a pending task was evicted
    Evicted,
    /// The task itself was discarded
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProducerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// No consumer has been started yet
    Idle,
    Running,
    /// Last producer left; the consumer is draining
    Terminating,
    Terminated,
}

struct State {
    tasks: VecDeque<Task>,
    status: Status,
    paused: bool,
    producers: HashMap<u64, Option<IdleHook>>,
    next_producer: u64,
    generation: u64,
    drain_epoch: u64,
    done: Option<(Sender<()>, Receiver<()>)>,
}

enum Next {
    Run(Task),
    Idle(Vec<IdleHook>),
    Exit,
}

pub struct AsyncQueue {
    capacity: usize,
    policy: OverflowPolicy,
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
    metrics: QueueMetrics,
    reporter: Arc<dyn ErrorReporter>,
    drain_timeout: Duration,
}

impl AsyncQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Result<Arc<Self>> {
        Self::with_reporter(capacity, policy, default_reporter())
    }

    pub fn with_reporter(
        capacity: usize,
        policy: OverflowPolicy,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Arc<Self>> {
        Self::with_drain_timeout(capacity, policy, reporter, DRAIN_TIMEOUT)
    }

    /// Like [`AsyncQueue::with_reporter`], bounding the final drain by
    /// `drain_timeout` instead of [`DRAIN_TIMEOUT`]
    pub fn with_drain_timeout(
        capacity: usize,
        policy: OverflowPolicy,
        reporter: Arc<dyn ErrorReporter>,
        drain_timeout: Duration,
    ) -> Result<Arc<Self>> {
        if capacity == 0 {
            return Err(LoggerError::config(
                "AsyncQueue",
                "capacity must be greater than zero",
            ));
        }

        Ok(Arc::new(Self {
            capacity,
            policy,
            state: Mutex::new(State {
                tasks: VecDeque::with_capacity(capacity.min(1024)),
                status: Status::Idle,
                paused: false,
                producers: HashMap::new(),
                next_producer: 1,
                generation: 0,
                drain_epoch: 0,
                done: None,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            metrics: QueueMetrics::new(),
            reporter,
            drain_timeout,
        }))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn metrics(&self) -> &QueueMetrics {
        &self.metrics
    }

    /// Number of tasks waiting for the consumer
    pub fn pending(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn producer_count(&self) -> usize {
        self.state.lock().producers.len()
    }

    pub fn is_terminating(&self) -> bool {
        self.state.lock().status == Status::Terminating
    }

    pub fn is_terminated(&self) -> bool {
        self.state.lock().status == Status::Terminated
    }

    /// Register a producer, starting the consumer if none is running
    pub fn register(self: &Arc<Self>, idle_hook: Option<IdleHook>) -> Result<ProducerId> {
        let mut state = self.state.lock();
        let id = state.next_producer;
        state.next_producer += 1;
        state.producers.insert(id, idle_hook);

        match state.status {
            Status::Running => {}
            Status::Terminating => {
                // The consumer is still alive; cancel the pending shutdown.
                state.status = Status::Running;
                if let Some((tx, _)) = &state.done {
                    let _ = tx.send(());
                }
            }
            Status::Idle | Status::Terminated => {
                if let Err(e) = self.start_consumer(&mut state) {
                    state.producers.remove(&id);
                    return Err(e);
                }
            }
        }

        Ok(ProducerId(id))
    }

    fn start_consumer(self: &Arc<Self>, state: &mut State) -> Result<()> {
        state.generation += 1;
        let generation = state.generation;
        let (done_tx, done_rx) = unbounded();

        let name = format!(
            "{}{}",
            CONSUMER_THREAD_PREFIX,
            NEXT_CONSUMER.fetch_add(1, Ordering::Relaxed)
        );
        let queue = Arc::clone(self);
        let signal = done_tx.clone();
        thread::Builder::new()
            .name(name)
            .spawn(move || queue.run(generation, signal))
            .map_err(|e| {
                LoggerError::io_operation("spawn", "failed to start async consumer", e)
            })?;

        state.done = Some((done_tx, done_rx));
        state.status = Status::Running;
        Ok(())
    }

    /// Remove a producer. The last one out drains and stops the consumer.
    ///
    /// Returns `false` while other producers keep the consumer alive, in
    /// which case nothing has been drained.
    pub fn deregister(&self, id: ProducerId) -> bool {
        let (epoch, done_rx) = {
            let mut state = self.state.lock();
            if state.producers.remove(&id.0).is_none() {
                return state.producers.is_empty();
            }
            if !state.producers.is_empty() {
                return false;
            }
            if state.status != Status::Running {
                return true;
            }
            state.status = Status::Terminating;
            state.drain_epoch += 1;
            self.not_empty.notify_all();
            (
                state.drain_epoch,
                state.done.as_ref().map(|(_, rx)| rx.clone()),
            )
        };

        let Some(done_rx) = done_rx else {
            return true;
        };

        let deadline = Instant::now() + self.drain_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let signalled = done_rx.recv_timeout(remaining).is_ok();

            let mut state = self.state.lock();
            if state.drain_epoch != epoch || state.status != Status::Terminating {
                // A new producer may have cancelled the drain.
                return state.status == Status::Terminated;
            }
            // A stale wake-up from an earlier restart; keep waiting.
            if signalled && Instant::now() < deadline {
                continue;
            }

            state.status = Status::Terminated;
            let abandoned = std::mem::take(&mut state.tasks);
            self.not_empty.notify_all();
            self.not_full.notify_all();
            drop(state);

            let abandoned = abandoned.len();
            self.metrics.record_dropped_many(abandoned as u64);
            self.reporter.report(&LoggerError::close_failure(
                "AsyncQueue",
                format!(
                    "consumer did not drain within {:?}; {} pending task(s) abandoned",
                    self.drain_timeout, abandoned
                ),
            ));
            return true;
        }
    }

    /// Enqueue a task, applying the overflow policy when the queue is full.
    ///
    /// Fails with [`LoggerError::RejectedTask`] once the consumer has
    /// terminated. A terminating consumer still accepts work.
    pub fn submit(&self, task: Task) -> Result<SubmitOutcome> {
        let mut state = self.state.lock();
        if state.status == Status::Terminated {
            drop(state);
            self.metrics.record_rejected();
            return Err(LoggerError::rejected("async consumer has terminated"));
        }
        self.metrics.record_submitted();

        if state.tasks.len() < self.capacity {
            state.tasks.push_back(task);
            self.not_empty.notify_one();
            return Ok(SubmitOutcome::Queued);
        }

        self.metrics.record_queue_full();
        match self.policy {
            OverflowPolicy::DropNewest => {
                let evicted = state.tasks.pop_back();
                state.tasks.push_back(task);
                self.not_empty.notify_one();
                drop(state);
                drop(evicted);
                self.metrics.record_dropped();
                Ok(SubmitOutcome::Evicted)
            }
            OverflowPolicy::DropOldest => {
                let evicted = state.tasks.pop_front();
                state.tasks.push_back(task);
                self.not_empty.notify_one();
                drop(state);
                drop(evicted);
                self.metrics.record_dropped();
                Ok(SubmitOutcome::Evicted)
            }
            OverflowPolicy::DropCurrent => {
                self.metrics.record_dropped();
                Ok(SubmitOutcome::Discarded)
            }
            OverflowPolicy::BlockUntilSpace => loop {
                self.metrics.record_block();
                self.not_full.wait_for(&mut state, BLOCK_SLICE);

                if state.status == Status::Terminated {
                    drop(state);
                    self.metrics.record_rejected();
                    return Err(LoggerError::rejected(
                        "async consumer terminated while waiting for space",
                    ));
                }
                if state.tasks.len() < self.capacity {
                    state.tasks.push_back(task);
                    self.not_empty.notify_one();
                    return Ok(SubmitOutcome::Queued);
                }
            },
        }
    }

    /// Enqueue a producer's last task regardless of capacity.
    ///
    /// No overflow policy applies, so the task runs after everything the
    /// producer queued before it. Fails only once the consumer has
    /// terminated; the task is then dropped on the calling thread.
    pub fn submit_final(&self, task: Task) -> Result<()> {
        let mut state = self.state.lock();
        if state.status == Status::Terminated {
            drop(state);
            self.metrics.record_rejected();
            return Err(LoggerError::rejected("async consumer has terminated"));
        }
        self.metrics.record_submitted();
        state.tasks.push_back(task);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Stop handing tasks to the consumer until [`AsyncQueue::resume`].
    ///
    /// A draining consumer ignores the pause.
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    pub fn resume(&self) {
        self.state.lock().paused = false;
        self.not_empty.notify_all();
    }

    fn next(&self, generation: u64) -> Next {
        let mut state = self.state.lock();
        loop {
            if state.generation != generation || state.status == Status::Terminated {
                return Next::Exit;
            }

            let draining = state.status == Status::Terminating;
            if !state.paused || draining {
                if let Some(task) = state.tasks.pop_front() {
                    self.not_full.notify_one();
                    return Next::Run(task);
                }
            }

            if draining && state.tasks.is_empty() {
                state.status = Status::Terminated;
                self.not_full.notify_all();
                return Next::Exit;
            }

            let timed_out = self.not_empty.wait_for(&mut state, IDLE_INTERVAL).timed_out();
            if timed_out && state.tasks.is_empty() && state.status == Status::Running {
                let hooks: Vec<IdleHook> = state.producers.values().flatten().cloned().collect();
                if !hooks.is_empty() {
                    return Next::Idle(hooks);
                }
            }
        }
    }

    fn run(self: Arc<Self>, generation: u64, done: Sender<()>) {
        loop {
            match self.next(generation) {
                Next::Run(task) => match catch_unwind(AssertUnwindSafe(task)) {
                    Ok(()) => {
                        self.metrics.record_written();
                    }
                    Err(panic) => {
                        self.metrics.record_dropped();
                        self.reporter.report(&LoggerError::write_failure(
                            "AsyncQueue",
                            format!("async write task panicked: {}", panic_message(&*panic)),
                        ));
                    }
                },
                Next::Idle(hooks) => {
                    for hook in hooks {
                        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| hook())) {
                            self.reporter.report(&LoggerError::other(format!(
                                "AsyncQueue idle hook panicked: {}",
                                panic_message(&*panic)
                            )));
                        }
                    }
                }
                Next::Exit => break,
            }
        }
        let _ = done.send(());
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for AsyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AsyncQueue")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("pending", &state.tasks.len())
            .field("status", &state.status)
            .field("producers", &state.producers.len())
            .finish()
    }
}
