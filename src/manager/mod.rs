//! Context-scoped logger management
//!
//! A [`ScopeRegistry`] maps each [`ExecutionContext`] to a [`LoggingScope`]
//! built from that context's properties. Sinks, formatters and filters named
//! in configuration are constructed through [`Plugins`].

pub mod context;
pub mod node;
pub mod plugins;
pub mod properties;
pub mod registry;
pub mod scope;

pub use context::{ConfigSource, ExecutionContext};
pub use node::{NodeId, NodeTree};
pub use plugins::{
    file_sink_config, sink_kind, BuildContext, FilterFactory, FormatterFactory, Plugins,
    SharedQueue, SinkFactory, SinkSettings,
};
pub use properties::{split_list, Properties};
pub use registry::{
    RegistryBuilder, ScopeRegistry, ASYNC_CAPACITY_ENV, ASYNC_POLICY_ENV, CONFIG_FILE_ENV,
    SYSTEM_CONTEXT_NAME,
};
pub use scope::{validate_logger_name, LoggingScope, ROOT_SINKS_KEY, SINKS_KEY};
