//! API Module
//!
//! HTTP handlers and routing for the gateway.
//!
//! # Endpoints
//! - `GET /api/*endpoint` - Resilient, cached upstream fetch
//! - `PUT /cache` - Store a JSON value
//! - `GET /cache/:key` - Read a cached value
//! - `DELETE /cache/:key` - Remove a cached value
//! - `GET /stats` - Call counters and cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
