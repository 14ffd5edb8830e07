//! Elasticsearch connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ElasticError, Result};

/// Connection settings for the Elasticsearch store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticConfig {
    /// Base URL of the cluster, e.g. `http://localhost:9200`.
    pub url: String,
    /// Index holding the messages.
    pub index: String,
    /// Basic auth user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Basic auth password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Wait for a refresh after each write so it is visible to the next search.
    pub refresh: bool,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "logpost-messages".to_string(),
            username: None,
            password: None,
            timeout_secs: 10,
            refresh: true,
        }
    }
}

impl ElasticConfig {
    /// Creates a config for the given cluster URL with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the index name.
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Sets basic auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the write refresh policy.
    #[must_use]
    pub const fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// The request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticError::Config`] if the URL is not http(s), the index
    /// name is empty or not lowercase, or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ElasticError::Config(format!(
                "url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.index.is_empty() {
            return Err(ElasticError::Config("index cannot be empty".to_string()));
        }
        if self.index.chars().any(|c| c.is_ascii_uppercase() || c == '/' || c == ' ') {
            return Err(ElasticError::Config(format!(
                "index '{}' must be lowercase without slashes or spaces",
                self.index
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ElasticError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}
