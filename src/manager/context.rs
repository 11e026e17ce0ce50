//! Execution contexts: the isolation boundaries scopes are keyed by

use super::properties::Properties;
use crate::core::error::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Where a context's configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Inline(String),
}

impl ConfigSource {
    /// Human readable resource name for error messages
    pub fn resource(&self) -> String {
        match self {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Inline(_) => "<inline>".to_string(),
        }
    }

    pub fn load(&self) -> Result<Properties> {
        match self {
            ConfigSource::File(path) => Properties::load(path),
            ConfigSource::Inline(text) => Properties::parse(text, "<inline>"),
        }
    }
}

#[derive(Debug)]
struct ContextInner {
    id: u64,
    name: String,
    parent: Option<ExecutionContext>,
    config: Option<ConfigSource>,
}

/// Opaque identity token for one isolation boundary.
///
/// Cloning is cheap and clones share the identity. The registry only keeps
/// a weak reference, so dropping every clone retires the context's scope.
///
/// # Example
///
/// ```
/// use rust_scoped_logger::manager::ExecutionContext;
///
/// let app = ExecutionContext::new("webapp-a")
///     .with_inline_config("sinks = ConsoleSink\n");
/// let request = app.child("request");
/// assert_eq!(request.parent().unwrap().id(), app.id());
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    /// A root context with no parent
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None, None)
    }

    /// A context whose scope falls back to this context's scope
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self::build(name.into(), Some(self.clone()), None)
    }

    fn build(name: String, parent: Option<ExecutionContext>, config: Option<ConfigSource>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
                name,
                parent,
                config,
            }),
        }
    }

    /// Attach a local configuration. The result is a new identity.
    #[must_use]
    pub fn with_config(self, config: ConfigSource) -> Self {
        Self::build(self.inner.name.clone(), self.inner.parent.clone(), Some(config))
    }

    #[must_use]
    pub fn with_config_file(self, path: impl Into<PathBuf>) -> Self {
        self.with_config(ConfigSource::File(path.into()))
    }

    #[must_use]
    pub fn with_inline_config(self, text: impl Into<String>) -> Self {
        self.with_config(ConfigSource::Inline(text.into()))
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&ExecutionContext> {
        self.inner.parent.as_ref()
    }

    pub fn config(&self) -> Option<&ConfigSource> {
        self.inner.config.as_ref()
    }

    /// Ancestors from the immediate parent outwards
    pub fn ancestors(&self) -> impl Iterator<Item = &ExecutionContext> {
        std::iter::successors(self.parent(), |ctx| ctx.parent())
    }

    pub(crate) fn downgrade(&self) -> WeakContext {
        WeakContext(Arc::downgrade(&self.inner))
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ExecutionContext {}

impl std::hash::Hash for ExecutionContext {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

/// Non-owning handle kept by the registry
#[derive(Debug, Clone)]
pub(crate) struct WeakContext(Weak<ContextInner>);

impl WeakContext {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_shared_by_clones() {
        let ctx = ExecutionContext::new("a");
        let clone = ctx.clone();
        assert_eq!(ctx, clone);
        assert_ne!(ctx, ExecutionContext::new("a"));
    }

    #[test]
    fn test_ancestors() {
        let root = ExecutionContext::new("root");
        let mid = root.child("mid");
        let leaf = mid.child("leaf");
        let names: Vec<&str> = leaf.ancestors().map(ExecutionContext::name).collect();
        assert_eq!(names, vec!["mid", "root"]);
    }

    #[test]
    fn test_weak_handle_tracks_drop() {
        let ctx = ExecutionContext::new("short");
        let weak = ctx.downgrade();
        assert!(weak.is_alive());
        drop(ctx);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_inline_config_loads() {
        let ctx = ExecutionContext::new("cfg").with_inline_config("a.level=FINE\n");
        let props = ctx.config().unwrap().load().unwrap();
        assert_eq!(props.get("a.level"), Some("FINE"));
    }
}
