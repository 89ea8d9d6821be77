//! HTTP API layer for pollpad.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: auth, poll management, response submission and summaries
//! - **Extractors**: Authentication and creator-role gating
//! - **Middleware**: Bearer/cookie token resolution
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
