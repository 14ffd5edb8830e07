//! Server configuration.
//!
//! Configuration for the logpost HTTP service, loaded from a JSON file:
//! - Listen address and CORS origins
//! - Which message store backs the service
//! - Pagination defaults applied to listings

use std::net::SocketAddr;
use std::path::Path;

use logpost_core::{PageRequest, PaginationPolicy, SortKey, SortOrder};
use logpost_elastic::ElasticConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Which message store to run against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-process index. Contents are lost on restart.
    #[default]
    Memory,
    /// Elasticsearch cluster.
    Elastic(ElasticConfig),
}

/// Defaults applied to listing parameters the client leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationDefaults {
    /// Page size.
    pub per_page: u64,
    /// Sort field.
    pub sort_by: SortKey,
    /// Sort direction.
    pub order: SortOrder,
}

impl Default for PaginationDefaults {
    fn default() -> Self {
        let defaults = PageRequest::default();
        Self {
            per_page: defaults.per_page,
            sort_by: defaults.sort_by,
            order: defaults.order,
        }
    }
}

impl PaginationDefaults {
    /// Builds the pagination policy for these defaults.
    #[must_use]
    pub fn policy(&self) -> PaginationPolicy {
        PaginationPolicy::new(PageRequest {
            page: 0,
            per_page: self.per_page,
            sort_by: self.sort_by,
            order: self.order,
        })
    }
}

/// Main server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
    /// Message store.
    pub backend: BackendConfig,
    /// Listing defaults.
    pub pagination: PaginationDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_origins: Vec::new(),
            backend: BackendConfig::default(),
            pagination: PaginationDefaults::default(),
        }
    }
}

impl ServerConfig {
    /// Create a configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the bind address.
    #[must_use]
    pub const fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Point the backend at an Elasticsearch cluster, keeping any other
    /// Elasticsearch settings already configured.
    #[must_use]
    pub fn with_elastic_url(mut self, url: impl Into<String>) -> Self {
        self.backend = match self.backend {
            BackendConfig::Elastic(elastic) => BackendConfig::Elastic(ElasticConfig {
                url: url.into(),
                ..elastic
            }),
            BackendConfig::Memory => BackendConfig::Elastic(ElasticConfig::new(url)),
        };
        self
    }

    /// Add a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }

    /// Set the message store.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// Set the listing defaults.
    #[must_use]
    pub const fn with_pagination(mut self, pagination: PaginationDefaults) -> Self {
        self.pagination = pagination;
        self
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(content: &str) -> ServerResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ServerError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> ServerResult<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ServerError::Config(format!("failed to encode config: {e}")))?;
        std::fs::write(path, content).map_err(|e| {
            ServerError::Config(format!("failed to write config file '{}': {e}", path.display()))
        })
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> ServerResult<()> {
        if self.pagination.per_page == 0 {
            return Err(ServerError::Config(
                "pagination.per_page must be positive".to_string(),
            ));
        }
        if let BackendConfig::Elastic(elastic) = &self.backend {
            elastic
                .validate()
                .map_err(|e| ServerError::Config(e.to_string()))?;
        }
        Ok(())
    }
}
