//! Registry mapping execution contexts to their logging scopes
//!
//! The registry is the entry point of the crate: build one with
//! [`ScopeRegistry::builder`], call [`ScopeRegistry::load_configuration`] at
//! startup and [`ScopeRegistry::shutdown`] before exit.

use super::context::{ConfigSource, ExecutionContext, WeakContext};
use super::plugins::{Plugins, SharedQueue};
use super::scope::{validate_logger_name, LoggingScope, ScopeSeed};
use crate::core::async_queue::{AsyncQueue, DEFAULT_QUEUE_CAPACITY};
use crate::core::clock::Clock;
use crate::core::error::{LoggerError, Result};
use crate::core::error_reporter::{default_reporter, ErrorReporter};
use crate::core::logger::Logger;
use crate::core::overflow_policy::OverflowPolicy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Path of the process-wide default configuration
pub const CONFIG_FILE_ENV: &str = "SCOPED_LOG_CONFIG_FILE";
/// Capacity of the shared async queue
pub const ASYNC_CAPACITY_ENV: &str = "SCOPED_LOG_ASYNC_CAPACITY";
/// Overflow policy of the shared async queue, by name or code `1`..`4`
pub const ASYNC_POLICY_ENV: &str = "SCOPED_LOG_ASYNC_POLICY";

/// Name of the context every other context chain ends in
pub const SYSTEM_CONTEXT_NAME: &str = "system";

/// Builder for [`ScopeRegistry`]
///
/// # Example
///
/// ```
/// use rust_scoped_logger::core::OverflowPolicy;
/// use rust_scoped_logger::manager::ScopeRegistry;
///
/// let registry = ScopeRegistry::builder()
///     .inline_config(".level = WARNING\nsinks = ConsoleSink\n")
///     .async_capacity(1024)
///     .overflow_policy(OverflowPolicy::BlockUntilSpace)
///     .build()
///     .unwrap();
/// registry.load_configuration();
/// registry.shutdown();
/// ```
pub struct RegistryBuilder {
    default_config: Option<ConfigSource>,
    plugins: Plugins,
    reporter: Arc<dyn ErrorReporter>,
    async_capacity: usize,
    overflow_policy: OverflowPolicy,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            default_config: None,
            plugins: Plugins::with_builtins(),
            reporter: default_reporter(),
            async_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }

    /// Builder seeded from `SCOPED_LOG_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed ones are errors.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::new();

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            if !path.trim().is_empty() {
                builder = builder.config_file(path.trim());
            }
        }

        if let Ok(value) = std::env::var(ASYNC_CAPACITY_ENV) {
            let capacity = value.trim().parse::<usize>().map_err(|e| {
                LoggerError::config(ASYNC_CAPACITY_ENV, format!("'{}': {}", value, e))
            })?;
            builder = builder.async_capacity(capacity);
        }

        if let Ok(value) = std::env::var(ASYNC_POLICY_ENV) {
            builder = builder.overflow_policy(value.parse()?);
        }

        Ok(builder)
    }

    #[must_use]
    pub fn default_config(mut self, source: ConfigSource) -> Self {
        self.default_config = Some(source);
        self
    }

    #[must_use]
    pub fn config_file(self, path: impl Into<PathBuf>) -> Self {
        self.default_config(ConfigSource::File(path.into()))
    }

    #[must_use]
    pub fn inline_config(self, text: impl Into<String>) -> Self {
        self.default_config(ConfigSource::Inline(text.into()))
    }

    #[must_use]
    pub fn plugins(mut self, plugins: Plugins) -> Self {
        self.plugins = plugins;
        self
    }

    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn async_capacity(mut self, capacity: usize) -> Self {
        self.async_capacity = capacity;
        self
    }

    #[must_use]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Date source for every file sink built by this registry
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.plugins.set_clock(clock);
        self
    }

    pub fn build(self) -> Result<ScopeRegistry> {
        if self.async_capacity == 0 {
            return Err(LoggerError::config(
                "async_capacity",
                "capacity must be greater than zero",
            ));
        }

        let mut system = ExecutionContext::new(SYSTEM_CONTEXT_NAME);
        if let Some(source) = self.default_config {
            system = system.with_config(source);
        }

        Ok(ScopeRegistry {
            system,
            queue: SharedQueue::new(
                self.async_capacity,
                self.overflow_policy,
                Arc::clone(&self.reporter),
            ),
            plugins: self.plugins,
            reporter: self.reporter,
            scopes: Mutex::new(HashMap::new()),
        })
    }
}

struct ScopeEntry {
    context: WeakContext,
    scope: Arc<LoggingScope>,
}

/// Execution context → [`LoggingScope`] map
///
/// Contexts are held weakly: once every clone of a context is dropped, its
/// scope is pruned on the next registry access. Scope construction and lookup
/// share one lock, so a scope is never built twice.
pub struct ScopeRegistry {
    system: ExecutionContext,
    plugins: Plugins,
    queue: SharedQueue,
    reporter: Arc<dyn ErrorReporter>,
    scopes: Mutex<HashMap<u64, ScopeEntry>>,
}

impl ScopeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The process-wide root context
    pub fn system_context(&self) -> &ExecutionContext {
        &self.system
    }

    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    pub fn reporter(&self) -> &Arc<dyn ErrorReporter> {
        &self.reporter
    }

    /// The shared async queue, if an async sink has been built
    pub fn async_queue(&self) -> Option<Arc<AsyncQueue>> {
        self.queue.existing()
    }

    /// Resolve the system scope, building its sinks
    pub fn load_configuration(&self) -> Arc<LoggingScope> {
        self.resolve_scope(&self.system)
    }

    /// Existing scope of `ctx`, or a new one built from its configuration
    pub fn resolve_scope(&self, ctx: &ExecutionContext) -> Arc<LoggingScope> {
        let (scope, retired) = {
            let mut scopes = self.scopes.lock();
            let retired = prune(&mut scopes);
            (self.resolve_locked(&mut scopes, ctx), retired)
        };
        for scope in retired {
            scope.close();
        }
        scope
    }

    fn resolve_locked(
        &self,
        scopes: &mut HashMap<u64, ScopeEntry>,
        ctx: &ExecutionContext,
    ) -> Arc<LoggingScope> {
        if let Some(entry) = scopes.get(&ctx.id()) {
            return Arc::clone(&entry.scope);
        }

        let parent_ctx = match ctx.parent() {
            Some(parent) => Some(parent),
            None if *ctx != self.system => Some(&self.system),
            None => None,
        };
        let parent = parent_ctx.map(|parent| self.resolve_locked(scopes, parent));

        let scope = LoggingScope::build(ScopeSeed {
            context_id: ctx.id(),
            context_name: ctx.name(),
            config: ctx.config(),
            parent,
            plugins: &self.plugins,
            queue: &self.queue,
            reporter: Arc::clone(&self.reporter),
        });
        scopes.insert(
            ctx.id(),
            ScopeEntry {
                context: ctx.downgrade(),
                scope: Arc::clone(&scope),
            },
        );
        scope
    }

    /// Register `name` in the scope of `ctx`
    pub fn register_logger(&self, ctx: &ExecutionContext, name: &str) -> Result<Arc<Logger>> {
        validate_logger_name(name)?;
        self.resolve_scope(ctx).register_logger(name)
    }

    /// Logger `name` in the scope of `ctx`, registering it on first use.
    /// The empty name is the scope's root logger.
    pub fn get_logger(&self, ctx: &ExecutionContext, name: &str) -> Result<Arc<Logger>> {
        let scope = self.resolve_scope(ctx);
        match scope.get_logger(name) {
            Some(logger) => Ok(logger),
            None => scope.register_logger(name),
        }
    }

    /// Close and forget the scope of `ctx`. Returns whether one existed.
    pub fn release(&self, ctx: &ExecutionContext) -> bool {
        let entry = self.scopes.lock().remove(&ctx.id());
        match entry {
            Some(entry) => {
                entry.scope.close();
                true
            }
            None => false,
        }
    }

    /// Live scopes, after pruning
    pub fn scope_count(&self) -> usize {
        let (count, retired) = {
            let mut scopes = self.scopes.lock();
            let retired = prune(&mut scopes);
            (scopes.len(), retired)
        };
        for scope in retired {
            scope.close();
        }
        count
    }

    /// Flush every sink of every live scope
    pub fn flush(&self) {
        for scope in self.live_scopes() {
            scope.flush();
        }
    }

    /// Close every sink of every scope and forget the scopes.
    ///
    /// Async sinks deregister from the shared queue first; the last one waits
    /// for the bounded drain.
    pub fn shutdown(&self) {
        let scopes: Vec<Arc<LoggingScope>> = self
            .scopes
            .lock()
            .drain()
            .map(|(_, entry)| entry.scope)
            .collect();
        let (async_first, rest): (Vec<_>, Vec<_>) = scopes
            .into_iter()
            .partition(|scope| scope.sinks().iter().any(|(_, sink)| sink.is_async()));
        for scope in async_first.into_iter().chain(rest) {
            scope.close();
        }
    }

    fn live_scopes(&self) -> Vec<Arc<LoggingScope>> {
        let (live, retired) = {
            let mut scopes = self.scopes.lock();
            let retired = prune(&mut scopes);
            let live: Vec<_> = scopes.values().map(|entry| Arc::clone(&entry.scope)).collect();
            (live, retired)
        };
        for scope in retired {
            scope.close();
        }
        live
    }
}

impl std::fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("system", &self.system.id())
            .field("scopes", &self.scopes.lock().len())
            .field("plugins", &self.plugins)
            .finish()
    }
}

/// Remove entries whose context is gone; the caller closes them unlocked
fn prune(scopes: &mut HashMap<u64, ScopeEntry>) -> Vec<Arc<LoggingScope>> {
    let dead: Vec<u64> = scopes
        .iter()
        .filter(|(_, entry)| !entry.context.is_alive())
        .map(|(id, _)| *id)
        .collect();
    dead.into_iter()
        .filter_map(|id| scopes.remove(&id))
        .map(|entry| entry.scope)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::error_reporter::CollectingReporter;

    fn registry() -> ScopeRegistry {
        ScopeRegistry::builder()
            .reporter(CollectingReporter::new())
            .build()
            .unwrap()
    }

    #[test]
    fn test_scope_is_built_once() {
        let registry = registry();
        let ctx = ExecutionContext::new("app");
        let first = registry.resolve_scope(&ctx);
        let second = registry.resolve_scope(&ctx.clone());
        assert!(Arc::ptr_eq(&first, &second));
        // app + system
        assert_eq!(registry.scope_count(), 2);
    }

    #[test]
    fn test_parentless_context_chains_to_system() {
        let registry = registry();
        let system = registry.load_configuration();
        let scope = registry.resolve_scope(&ExecutionContext::new("orphan"));
        assert_eq!(scope.parent().unwrap().context_id(), system.context_id());
        assert!(system.parent().is_none());
    }

    #[test]
    fn test_dropped_context_is_pruned() {
        let registry = registry();
        let ctx = ExecutionContext::new("short-lived");
        registry.register_logger(&ctx, "a.b").unwrap();
        assert_eq!(registry.scope_count(), 2);

        drop(ctx);
        assert_eq!(registry.scope_count(), 1);
    }

    #[test]
    fn test_release() {
        let registry = registry();
        let ctx = ExecutionContext::new("released");
        registry.resolve_scope(&ctx);
        assert!(registry.release(&ctx));
        assert!(!registry.release(&ctx));
    }

    #[test]
    fn test_invalid_name_fails_before_scope_construction() {
        let registry = registry();
        let ctx = ExecutionContext::new("app");
        let err = registry.register_logger(&ctx, "a..b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(registry.scope_count(), 0);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ScopeRegistry::builder().async_capacity(0).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_get_logger_returns_registered_instance() {
        let registry = registry();
        let ctx = ExecutionContext::new("app");
        let registered = registry.register_logger(&ctx, "db").unwrap();
        let fetched = registry.get_logger(&ctx, "db").unwrap();
        assert!(Arc::ptr_eq(&registered, &fetched));
        assert_eq!(registry.get_logger(&ctx, "").unwrap().name(), "");
    }
}
