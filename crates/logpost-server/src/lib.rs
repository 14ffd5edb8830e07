//! # logpost-server
//!
//! HTTP API for the logpost log collector, built on axum.
//!
//! Clients submit structured log messages and page through them with
//! filters. The server runs over any [`logpost_core::MessageStore`]: the
//! in-process [`logpost_core::MemoryStore`] or
//! [`logpost_elastic::ElasticStore`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use logpost_core::MemoryStore;
//! use logpost_server::{LogServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let addr = config.bind_addr;
//!     let server = LogServer::new(MemoryStore::new(), config);
//!     // server.serve_with_shutdown(addr, std::future::pending()).await.unwrap();
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/` | GET | Liveness text |
//! | `/version` | GET | Service version |
//! | `/health` | GET | Liveness JSON with uptime |
//! | `/messages` | POST | Ingest one message |
//! | `/messages` | GET | Paginated listing `{data, pagination}` |
//! | `/v1/messages` | GET | Same listing as a bare array |
//! | `/admin/stats` | GET | `{createdOn, numMessages}` |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use config::{BackendConfig, PaginationDefaults, ServerConfig};
pub use error::{ApiError, ApiResult, ServerError, ServerResult};
pub use routes::create_router;
pub use server::LogServer;
pub use state::AppState;
