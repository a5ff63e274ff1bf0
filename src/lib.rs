//! # rttp-cache
//!
//! HTTP response caching for the rttp async HTTP/1.1 framework: a middleware
//! that stores handler output in memory, replays it on repeat requests, and
//! answers conditional requests (`If-None-Match`, `If-Modified-Since`) with
//! `304 Not Modified`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use rttp_cache::cache::{CacheConfig, CacheMiddleware};
//! use rttp_cache::context::Context;
//! use rttp_cache::middleware::{LoggerMiddleware, Pipeline};
//! use rttp_cache::server::Server;
//! use rttp_cache::{Response, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(|_ctx: Context| async {
//!         Response::new(StatusCode::Ok).body("Hello, World!")
//!     })
//!     .layer(LoggerMiddleware)
//!     .layer(CacheMiddleware::new(CacheConfig::new().ttl(Duration::from_secs(60))));
//!
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     println!("Listening on http://127.0.0.1:8080");
//!     server.run(pipeline).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod context;
pub mod http;
pub mod middleware;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
