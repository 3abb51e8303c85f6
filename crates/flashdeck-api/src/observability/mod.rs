//! Observability infrastructure for Flashdeck.
//!
//! This module provides:
//! - Structured logging configuration
//! - The Prometheus metrics recorder and `/metrics` endpoint

mod logging;
mod metrics;

pub use logging::{init_logging, json_subscriber, parse_log_level, LoggingConfig};
pub use metrics::{init_metrics, metrics_handler, MetricsError, MetricsState};
