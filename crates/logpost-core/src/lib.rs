//! # logpost-core
//!
//! Message model, query compilation and storage abstraction for the logpost
//! log collector.
//!
//! This crate provides:
//!
//! - [`Message`] - Log records with validation, plus [`Severity`] levels
//! - [`PaginationPolicy`] - Defaults and validation for page, size and order
//! - [`FilterParams`] and [`compile`] - Filters compiled into a [`SearchRequest`]
//! - [`MessageStore`] - Abstract trait for search-indexed backends
//! - [`MemoryStore`] - In-process search index
//! - [`LogService`] - Ingest and query handlers with [`Stats`]
//!
//! ## Example
//!
//! ```rust
//! use logpost_core::{FilterParams, Message, PaginationPolicy, QueryParams, Severity, compile};
//! use chrono::Utc;
//!
//! let message = Message::builder()
//!     .service("billing")
//!     .address("10.0.0.4:9000")
//!     .created_on(Utc::now())
//!     .severity(Severity::Warning)
//!     .message("card declined")
//!     .build();
//! assert!(message.is_ok());
//!
//! let params = QueryParams::new().with_service("billing").with_per_page("25");
//! let page = PaginationPolicy::default().normalize(&params);
//! let filters = FilterParams::parse(&params);
//! assert!(page.is_ok() && filters.is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod filter;
pub mod pagination;
pub mod params;
pub mod query;
pub mod service;
pub mod store;
pub mod traits;
pub mod types;

// Re-export main types
pub use error::{LogError, Result};
pub use filter::{compile, FilterParams};
pub use pagination::{PageRequest, PaginationPolicy, SortKey, SortOrder};
pub use params::QueryParams;
pub use query::{Clause, QuerySpec, SearchRequest, SortSpec};
pub use service::{LogService, MessagePage, PaginationInfo, Stats};
pub use store::{decode_hit, decode_hits, to_document, IdSequence, MemoryStore};
pub use traits::{MessageStore, SearchPage};
pub use types::{
    AuditData, Message, MessageBuilder, MessageId, MetricData, Severity, StoredMessage,
};
