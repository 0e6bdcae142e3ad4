//! Observability plugins for conversation turns.
//!
//! ```rust
//! use gobserve::{METRICS_PLUGIN_NAME, TRACING_PLUGIN_NAME, metrics_plugin, tracing_plugin};
//!
//! assert_eq!(tracing_plugin().name(), TRACING_PLUGIN_NAME);
//! assert_eq!(metrics_plugin().name(), METRICS_PLUGIN_NAME);
//! ```

mod metrics_hooks;
mod tracing_hooks;

pub use metrics_hooks::{METRICS_PLUGIN_NAME, metrics_plugin};
pub use tracing_hooks::{TRACING_PLUGIN_NAME, tracing_plugin};

/// Both observability plugins, tracing first.
pub fn observability_plugins() -> Vec<gchat::Plugin> {
    vec![tracing_plugin(), metrics_plugin()]
}

pub mod prelude {
    pub use crate::{metrics_plugin, observability_plugins, tracing_plugin};
}
