//! Per-context logging scope
//!
//! A scope bundles everything one execution context logs through: its
//! properties, the sinks built from them, a namespace tree and the loggers
//! bound into it. Scopes of child contexts link to the scope of their parent
//! context for property, sink and root-logger fallback.

use super::context::ConfigSource;
use super::node::{NodeId, NodeTree};
use super::plugins::{Plugins, SharedQueue};
use super::properties::{split_list, Properties};
use crate::core::error::{LoggerError, Result};
use crate::core::error_reporter::ErrorReporter;
use crate::core::log_level::LevelFilter;
use crate::core::logger::Logger;
use crate::core::sink::Sink;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Property naming the sinks to build for a scope
pub const SINKS_KEY: &str = "sinks";

/// Root logger's own sink list, honored only while the root is constructed
pub const ROOT_SINKS_KEY: &str = ".sinks";

struct ScopeState {
    tree: NodeTree,
    loggers: HashMap<String, Arc<Logger>>,
}

pub struct LoggingScope {
    context_id: u64,
    context_name: String,
    parent: Option<Arc<LoggingScope>>,
    properties: Properties,
    sinks: HashMap<String, Arc<dyn Sink>>,
    /// Identifiers in configuration order
    sink_order: Vec<String>,
    root: Arc<Logger>,
    reporter: Arc<dyn ErrorReporter>,
    state: Mutex<ScopeState>,
}

/// Inputs for building one scope
pub(crate) struct ScopeSeed<'a> {
    pub context_id: u64,
    pub context_name: &'a str,
    pub config: Option<&'a ConfigSource>,
    pub parent: Option<Arc<LoggingScope>>,
    pub plugins: &'a Plugins,
    pub queue: &'a SharedQueue,
    pub reporter: Arc<dyn ErrorReporter>,
}

impl LoggingScope {
    /// Load configuration, build sinks and register the root logger.
    ///
    /// Configuration and sink failures are reported; the scope then carries
    /// whatever could be built, in the worst case only a bare root logger.
    pub(crate) fn build(seed: ScopeSeed<'_>) -> Arc<Self> {
        let properties = match seed.config.map(ConfigSource::load) {
            Some(Ok(properties)) => properties,
            Some(Err(e)) => {
                seed.reporter.report(&e);
                Properties::new()
            }
            None => Properties::new(),
        };
        let properties = expand_properties(&properties, seed.context_name);

        let root = Arc::new(Logger::new(""));
        if seed.config.is_none() {
            root.set_parent(seed.parent.as_ref().map(|scope| scope.root_logger()));
        }

        let mut scope = Self {
            context_id: seed.context_id,
            context_name: seed.context_name.to_string(),
            parent: seed.parent,
            properties,
            sinks: HashMap::new(),
            sink_order: Vec::new(),
            root,
            reporter: seed.reporter,
            state: Mutex::new(ScopeState {
                tree: NodeTree::new(),
                loggers: HashMap::new(),
            }),
        };

        if let Some(list) = scope.properties.get(SINKS_KEY).map(String::from) {
            let attach_to_root = !scope.properties.contains_key(ROOT_SINKS_KEY);
            for id in split_list(&list) {
                if scope.sinks.contains_key(id) {
                    continue;
                }
                match seed.plugins.build_sink(
                    id,
                    &scope.properties,
                    seed.queue,
                    Arc::clone(&scope.reporter),
                ) {
                    Ok(sink) => {
                        if attach_to_root {
                            scope.root.add_sink(Arc::clone(&sink));
                        }
                        scope.sinks.insert(id.to_string(), sink);
                        scope.sink_order.push(id.to_string());
                    }
                    Err(e) => scope.reporter.report(&e),
                }
            }
        }

        let scope = Arc::new(scope);
        {
            let mut state = scope.state.lock();
            if let Err(e) = scope.register_locked(&mut state, "", true) {
                scope.reporter.report(&e);
            }
        }
        scope
    }

    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    pub fn parent(&self) -> Option<&Arc<LoggingScope>> {
        self.parent.as_ref()
    }

    pub fn root_logger(&self) -> Arc<Logger> {
        Arc::clone(&self.root)
    }

    /// The scope's own properties, without ancestor fallback
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Effective value of `key`, with ancestor fallback
    pub fn property(&self, key: &str) -> Option<String> {
        self.lookup_property(key, false)
    }

    fn lookup_property(&self, key: &str, constructing_root: bool) -> Option<String> {
        if key == ROOT_SINKS_KEY && !constructing_root {
            return None;
        }
        self.find_property(key).map(String::from)
    }

    /// Local value; ancestors are consulted only while the local set is
    /// empty, stopping at the first ancestor that has the key or any keys.
    fn find_property(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.properties.get(key) {
            return Some(value);
        }
        if !self.properties.is_empty() {
            return None;
        }
        let mut current = self.parent.as_deref();
        while let Some(scope) = current {
            let value = scope.properties.get(key);
            if value.is_some() || !scope.properties.is_empty() {
                return value;
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// Sink by identifier, searching this scope and then its ancestors
    pub fn find_sink(&self, id: &str) -> Option<Arc<dyn Sink>> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(sink) = scope.sinks.get(id) {
                return Some(Arc::clone(sink));
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// Sinks built for this scope, in configuration order
    pub fn sinks(&self) -> Vec<(String, Arc<dyn Sink>)> {
        self.sink_order
            .iter()
            .filter_map(|id| self.sinks.get(id).map(|sink| (id.clone(), Arc::clone(sink))))
            .collect()
    }

    pub fn get_logger(&self, name: &str) -> Option<Arc<Logger>> {
        self.state.lock().loggers.get(name).cloned()
    }

    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().loggers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register `name` (and every dot-prefix of it), or return the existing logger
    pub fn register_logger(&self, name: &str) -> Result<Arc<Logger>> {
        validate_logger_name(name)?;
        let mut state = self.state.lock();
        self.register_locked(&mut state, name, false)
    }

    /// Run `f` against the namespace tree
    pub fn with_tree<R>(&self, f: impl FnOnce(&NodeTree) -> R) -> R {
        f(&self.state.lock().tree)
    }

    fn register_locked(
        &self,
        state: &mut ScopeState,
        name: &str,
        constructing_root: bool,
    ) -> Result<Arc<Logger>> {
        if let Some(existing) = state.loggers.get(name) {
            return Ok(Arc::clone(existing));
        }

        let logger = if name.is_empty() {
            Arc::clone(&self.root)
        } else {
            Arc::new(Logger::new(name))
        };

        if let Some(level) = self.lookup_property(&format!("{}.level", name), constructing_root) {
            match level.trim().parse::<LevelFilter>() {
                Ok(level) => logger.set_level(Some(level)),
                Err(message) => self.reporter.report(&LoggerError::configuration(
                    format!("{}.level", name),
                    message,
                )),
            }
        }

        if let Some((parent_name, _)) = name.rsplit_once('.') {
            self.register_locked(state, parent_name, false)?;
        }

        let node: NodeId = state.tree.find_node(name);
        state.tree.bind(node, Arc::clone(&logger));
        if !name.is_empty() {
            let parent = state
                .tree
                .find_parent_logger(node)
                .unwrap_or_else(|| Arc::clone(&self.root));
            logger.set_parent(Some(parent));
        }
        state.tree.propagate_parent(node, &logger);

        let sinks_key = format!("{}.sinks", name);
        if let Some(list) = self.lookup_property(&sinks_key, constructing_root) {
            logger.set_use_parent_sinks(false);
            for id in split_list(&list) {
                match self.find_sink(id) {
                    Some(sink) => logger.add_sink(sink),
                    None => self.reporter.report(&LoggerError::configuration(
                        sinks_key.as_str(),
                        format!("unknown sink '{}'", id),
                    )),
                }
            }
        }

        let parent_sinks_key = format!("{}.useParentSinks", name);
        if let Some(flag) = self.lookup_property(&parent_sinks_key, constructing_root) {
            if flag.trim().eq_ignore_ascii_case("true") {
                logger.set_use_parent_sinks(true);
            }
        }

        state.loggers.insert(name.to_string(), Arc::clone(&logger));
        Ok(logger)
    }

    /// Flush every sink of this scope
    pub fn flush(&self) {
        for id in &self.sink_order {
            if let Some(sink) = self.sinks.get(id) {
                sink.flush();
            }
        }
    }

    /// Close every sink of this scope, async sinks first
    pub fn close(&self) {
        let (async_sinks, direct_sinks): (Vec<_>, Vec<_>) = self
            .sink_order
            .iter()
            .filter_map(|id| self.sinks.get(id))
            .partition(|sink| sink.is_async());
        for sink in async_sinks.into_iter().chain(direct_sinks) {
            sink.close();
        }
    }
}

impl std::fmt::Debug for LoggingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingScope")
            .field("context_id", &self.context_id)
            .field("context_name", &self.context_name)
            .field("parent", &self.parent.as_ref().map(|p| p.context_id))
            .field("sinks", &self.sink_order)
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Reject empty segments: `a..b`, `.a`, `a.`
pub fn validate_logger_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Ok(());
    }
    if name.split('.').any(str::is_empty) {
        return Err(LoggerError::invalid_logger_name(
            name,
            "names must not contain empty segments",
        ));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(LoggerError::invalid_logger_name(
            name,
            "names must not contain whitespace",
        ));
    }
    Ok(())
}

fn expand_properties(properties: &Properties, context_name: &str) -> Properties {
    let mut expanded = Properties::new();
    for (key, value) in properties.iter() {
        expanded.set(key, expand_placeholders(value, context_name));
    }
    expanded
}

/// Replace `${context.name}` with the scope's context name and `${VAR}` with
/// the environment variable `VAR`. Unknown placeholders are left as written.
fn expand_placeholders(value: &str, context_name: &str) -> String {
    if !value.contains("${") {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        let replacement = if name == "context.name" {
            Some(context_name.to_string())
        } else {
            std::env::var(name).ok()
        };
        match replacement {
            Some(replacement) => out.push_str(&replacement),
            None => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
