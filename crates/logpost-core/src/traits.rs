//! Traits for message storage backends.
//!
//! This module provides the [`MessageStore`] trait, the narrow capability
//! the ingest and query paths need from a search-indexed backend.

use std::future::Future;

use crate::error::Result;
use crate::query::SearchRequest;
use crate::types::{Message, MessageId, StoredMessage};

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Well-formed hits, already sorted and windowed.
    pub hits: Vec<StoredMessage>,
    /// Total number of matching documents, independent of the page window.
    pub total: u64,
}

/// Trait for message storage backends.
///
/// Implementors own the backing index: its schema, id assignment, and
/// query execution.
#[allow(async_fn_in_trait)]
pub trait MessageStore: Send + Sync + 'static {
    /// Creates the index and its mapping if absent. Safe to call repeatedly
    /// and from several instances at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or refuses the schema.
    fn ensure_schema(&self) -> impl Future<Output = Result<()>> + Send;

    /// Assigns the next sequential id and indexes the message under it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn write(&self, message: &Message) -> impl Future<Output = Result<MessageId>> + Send;

    /// Executes a search, returning the requested page and the total match count.
    ///
    /// Stored documents that fail to parse or validate are dropped from the
    /// page rather than failing the whole request.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be executed.
    fn search(&self, request: &SearchRequest) -> impl Future<Output = Result<SearchPage>> + Send;

    /// Removes the whole index. Administrative and test use only.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    fn teardown(&self) -> impl Future<Output = Result<()>> + Send;
}
