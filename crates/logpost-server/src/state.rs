//! Shared state for request handlers.

use logpost_core::{LogService, MessageStore};

use crate::config::ServerConfig;

/// State shared by every request handler.
#[derive(Debug)]
pub struct AppState<S> {
    service: LogService<S>,
    config: ServerConfig,
}

impl<S: MessageStore> AppState<S> {
    /// Creates state for a store using the configured pagination defaults.
    pub fn new(store: S, config: ServerConfig) -> Self {
        let service = LogService::with_policy(store, config.pagination.policy());
        Self { service, config }
    }

    /// The collector service.
    pub const fn service(&self) -> &LogService<S> {
        &self.service
    }

    /// The server configuration.
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        u64::try_from(self.service.uptime().num_seconds()).unwrap_or(0)
    }
}
