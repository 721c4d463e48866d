// Application state (AppState)

use crate::core::config::Config;
use crate::metrics::collector::Metrics;
use crate::stores::registry::Registry;
use std::sync::Arc;

/// Shared application state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    /// Sole owner of the session
    pub registry: Arc<Registry>,

    /// Command counters
    pub metrics: Arc<Metrics>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, registry: Arc<Registry>) -> Self {
        Self {
            registry,
            metrics: Arc::new(Metrics::new()),
            config: Arc::new(config),
        }
    }
}
