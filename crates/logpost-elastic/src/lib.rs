//! # logpost-elastic
//!
//! Elasticsearch-backed [`logpost_core::MessageStore`].
//!
//! This crate provides:
//!
//! - [`ElasticConfig`] - Cluster URL, index, credentials and timeouts
//! - [`ElasticStore`] - Store adapter over the Elasticsearch REST API
//! - [`ElasticError`] - Adapter errors, mapped to backend-agnostic
//!   [`logpost_core::LogError::Backend`] at the trait boundary
//!
//! Search requests are sent in the query DSL produced by
//! [`logpost_core::SearchRequest::to_json`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod mapping;
pub mod store;

pub use config::ElasticConfig;
pub use error::{ElasticError, Result};
pub use mapping::{index_body, parse_search_response};
pub use store::ElasticStore;
