//! flashdeck-api: HTTP API layer
//!
//! This crate provides the API layer including:
//! - HTTP JSON endpoints via Axum
//! - Session cookie handling
//! - Middleware (request ids, logging, metrics, tracing, CORS)
//! - Observability setup (logging, Prometheus metrics)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               flashdeck-api                  │
//! ├─────────────────────────────────────────────┤
//! │  http/          - Routes, errors, sessions  │
//! │  middleware/    - Request ids, metrics, log │
//! │  observability/ - Logging and Prometheus    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod http;
pub mod middleware;
pub mod observability;
