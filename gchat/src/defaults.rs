//! Process-wide default plugins.
//!
//! Set once at startup; every conversation built afterward snapshots the list
//! ahead of its own plugins. Conversations never mutate it.

use std::sync::OnceLock;

use crate::{ChatError, Plugin, pipeline::ensure_unique_names};

static DEFAULT_PLUGINS: OnceLock<Vec<Plugin>> = OnceLock::new();

/// Registers the default plugins. Fails if called more than once.
pub fn set_default_plugins(plugins: Vec<Plugin>) -> Result<(), ChatError> {
    ensure_unique_names(&plugins)?;
    let count = plugins.len();
    DEFAULT_PLUGINS
        .set(plugins)
        .map_err(|_| ChatError::validation("default plugins have already been set"))?;

    tracing::debug!(phase = "plugin", event = "defaults_set", count);
    Ok(())
}

pub fn default_plugins() -> Vec<Plugin> {
    DEFAULT_PLUGINS.get().cloned().unwrap_or_default()
}
