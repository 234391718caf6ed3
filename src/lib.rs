/// Settings loading (defaults, config file, `SCOPEBUS_*` environment).
pub mod config;
/// Structured logging on top of `tracing` (filters, formatters).
pub mod logging;
/// Topics, topic codec and the synchronous event bus.
pub mod pubsub;
/// Module registry: namespaces, instances, handles.
pub mod registry;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::Settings;
/// Logging initialization.
pub use logging::{init_logging, log_error, LogFormat, LoggingConfig, LoggingError};
/// Topic encoding and the bus underneath the registry.
pub use pubsub::{Event, EventBus, InstanceId, Scope, TopicCodec, TopicId};
/// Registry API.
pub use registry::{
    BulkHandle, Constructor, Handle, Listener, RedefinitionPolicy, Registry, ALL_EVENTS,
};
/// Operation errors and result types.
pub use scopebus_error::{ErrorExt, RegistryError, RegistryResult, StatusCode};
/// Positional event arguments.
pub use serde_json::{json, Value};
