//! Numeric thread identities and name resolution for off-thread rendering
//!
//! Records carry only the numeric identity of the thread that created them.
//! When a record is rendered by an async consumer thread the formatter needs
//! the *producer's* name, which is looked up here: first in a per-thread LRU
//! cache, then in the registry of live threads, and finally the identity
//! itself is used when the producer has already exited.

use lru::LruCache;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread;

/// Maximum number of names remembered per rendering thread
pub const THREAD_NAME_CACHE_SIZE: usize = 10_000;

/// Name prefix of every async consumer thread
pub const CONSUMER_THREAD_PREFIX: &str = "AsyncSinkWriter-";

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(THREAD_NAME_CACHE_SIZE) {
    Some(capacity) => capacity,
    None => panic!("thread name cache size must be non-zero"),
};

// Identities start at 1; 0 marks a thread whose identity was already torn down.
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

fn live_threads() -> &'static RwLock<HashMap<u64, String>> {
    static LIVE: OnceLock<RwLock<HashMap<u64, String>>> = OnceLock::new();
    LIVE.get_or_init(|| RwLock::new(HashMap::new()))
}

struct ThreadIdentity {
    id: u64,
    name: String,
}

impl ThreadIdentity {
    fn register() -> Self {
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        let name = thread::current()
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("thread-{}", id));
        live_threads().write().insert(id, name.clone());
        Self { id, name }
    }
}

impl Drop for ThreadIdentity {
    fn drop(&mut self) {
        live_threads().write().remove(&self.id);
    }
}

thread_local! {
    static IDENTITY: ThreadIdentity = ThreadIdentity::register();
    static NAME_CACHE: RefCell<LruCache<u64, String>> = RefCell::new(LruCache::new(CACHE_CAPACITY));
}

/// Numeric identity of the calling thread, registering it on first use
pub fn current_thread_id() -> u64 {
    IDENTITY.try_with(|identity| identity.id).unwrap_or(0)
}

/// Name of the calling thread as it is recorded in the live registry
pub fn current_thread_name() -> String {
    IDENTITY
        .try_with(|identity| identity.name.clone())
        .unwrap_or_else(|_| thread::current().name().unwrap_or("unknown").to_string())
}

/// Live lookup, `None` once the thread has exited
pub fn live_thread_name(id: u64) -> Option<String> {
    live_threads().read().get(&id).cloned()
}

/// Resolve the name of thread `id` from the perspective of the calling thread.
pub fn resolve_thread_name(id: u64) -> String {
    let cached = NAME_CACHE
        .try_with(|cache| cache.borrow_mut().get(&id).cloned())
        .ok()
        .flatten();
    if let Some(name) = cached {
        return name;
    }

    match live_thread_name(id) {
        Some(name) => {
            let _ = NAME_CACHE.try_with(|cache| cache.borrow_mut().put(id, name.clone()));
            name
        }
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_identity_is_stable_per_thread() {
        let first = current_thread_id();
        assert_ne!(first, 0);
        assert_eq!(first, current_thread_id());

        let other = thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_live_lookup_and_exit() {
        let (id_tx, id_rx) = bounded(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let producer = thread::Builder::new()
            .name("producer-1".to_string())
            .spawn(move || {
                id_tx.send(current_thread_id()).unwrap();
                let _ = stop_rx.recv();
            })
            .unwrap();

        let id = id_rx.recv().unwrap();
        assert_eq!(live_thread_name(id).as_deref(), Some("producer-1"));

        stop_tx.send(()).unwrap();
        producer.join().unwrap();

        assert_eq!(live_thread_name(id), None);
        // A thread that never cached the name falls back to the identity
        let resolved = thread::spawn(move || resolve_thread_name(id)).join().unwrap();
        assert_eq!(resolved, id.to_string());
    }

    #[test]
    fn test_cache_outlives_producer() {
        let (id_tx, id_rx) = bounded(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (query_tx, query_rx) = bounded::<u64>(1);
        let (answer_tx, answer_rx) = bounded::<String>(1);

        let producer = thread::Builder::new()
            .name("request-worker".to_string())
            .spawn(move || {
                id_tx.send(current_thread_id()).unwrap();
                let _ = stop_rx.recv();
            })
            .unwrap();
        let id = id_rx.recv().unwrap();

        let renderer = thread::spawn(move || {
            while let Ok(id) = query_rx.recv() {
                answer_tx.send(resolve_thread_name(id)).unwrap();
            }
        });

        query_tx.send(id).unwrap();
        assert_eq!(answer_rx.recv().unwrap(), "request-worker");

        stop_tx.send(()).unwrap();
        producer.join().unwrap();

        query_tx.send(id).unwrap();
        assert_eq!(answer_rx.recv().unwrap(), "request-worker");

        drop(query_tx);
        renderer.join().unwrap();
    }
}
