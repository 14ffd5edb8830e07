//! Ingest and query handlers plus process-lifetime statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::Result;
use crate::filter::{compile, FilterParams};
use crate::pagination::{PaginationPolicy, SortKey, SortOrder};
use crate::params::QueryParams;
use crate::traits::MessageStore;
use crate::types::{Message, StoredMessage};

/// Process-lifetime counters.
///
/// `num_messages` counts successful ingests by this instance since it
/// started, not the number of messages held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// When the service instance started
    pub created_on: DateTime<Utc>,
    /// Successful ingests since start
    pub num_messages: u64,
}

/// Effective pagination parameters echoed with every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    /// Zero-based page number
    pub page: u64,
    /// Page size
    pub per_page: u64,
    /// Total matches before pagination
    pub count: u64,
    /// Sort field
    pub sort_by: SortKey,
    /// Sort direction
    pub order: SortOrder,
}

/// One page of a message listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    /// Messages on this page, in sort order
    pub data: Vec<StoredMessage>,
    /// Effective pagination parameters
    pub pagination: PaginationInfo,
}

/// The collector service: validates and ingests messages, answers queries,
/// and keeps its own statistics.
///
/// One instance is constructed at startup and shared by every handler.
#[derive(Debug)]
pub struct LogService<S> {
    store: S,
    policy: PaginationPolicy,
    started: DateTime<Utc>,
    num_messages: AtomicU64,
}

impl<S: MessageStore> LogService<S> {
    /// Creates a service over `store` with default pagination.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, PaginationPolicy::default())
    }

    /// Creates a service over `store` with the given pagination policy.
    pub fn with_policy(store: S, policy: PaginationPolicy) -> Self {
        Self {
            store,
            policy,
            started: Utc::now(),
            num_messages: AtomicU64::new(0),
        }
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The pagination policy in effect.
    pub const fn policy(&self) -> &PaginationPolicy {
        &self.policy
    }

    /// Time elapsed since the service started.
    pub fn uptime(&self) -> chrono::TimeDelta {
        Utc::now() - self.started
    }

    /// Validates and stores a message.
    ///
    /// Nothing is written and no counter moves unless validation passes and
    /// the store accepts the write.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LogError::MissingField`] for an invalid message, or a
    /// backend error if the store rejects it.
    pub async fn post_message(&self, message: Message) -> Result<StoredMessage> {
        if let Err(e) = message.validate() {
            debug!(error = %e, "rejected message");
            return Err(e);
        }

        let id = match self.store.write(&message).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, service = %message.service, "failed to store message");
                return Err(e);
            }
        };
        self.num_messages.fetch_add(1, Ordering::AcqRel);
        debug!(id = %id, service = %message.service, "accepted message");

        Ok(StoredMessage { id, message })
    }

    /// Lists messages matching the given raw query parameters.
    ///
    /// # Errors
    ///
    /// Returns a client error for malformed parameters, or a backend error
    /// if the search fails.
    pub async fn get_messages(&self, params: &QueryParams) -> Result<MessagePage> {
        let page = self.policy.normalize(params).inspect_err(|e| {
            debug!(error = %e, "rejected pagination parameters");
        })?;
        let filters = FilterParams::parse(params).inspect_err(|e| {
            debug!(error = %e, "rejected filter parameters");
        })?;
        let request = compile(&page, &filters)?;
        debug!(
            match_all = request.is_match_all(),
            from = request.from,
            size = request.size,
            "searching messages"
        );

        let result = match self.store.search(&request).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, query = %request.to_json(), "message search failed");
                return Err(e);
            }
        };

        Ok(MessagePage {
            data: result.hits,
            pagination: PaginationInfo {
                page: page.page,
                per_page: page.per_page,
                count: result.total,
                sort_by: page.sort_by,
                order: page.order,
            },
        })
    }

    /// Current statistics.
    pub fn stats(&self) -> Stats {
        Stats {
            created_on: self.started,
            num_messages: self.num_messages.load(Ordering::Acquire),
        }
    }
}
