//! HTTP request metrics.
//!
//! - `flashdeck_http_requests_total`: counter labelled method, path, status_class
//! - `flashdeck_http_request_duration_seconds`: histogram, same labels
//!
//! `path` is the matched route pattern (`/sets/:set_id`), or `unmatched`.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use axum::http::{Method, StatusCode};

/// Response status grouped by its first digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        match status.as_u16() {
            100..=199 => Self::Informational,
            200..=299 => Self::Success,
            300..=399 => Self::Redirection,
            400..=499 => Self::ClientError,
            _ => Self::ServerError,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Informational => "1xx",
            Self::Success => "2xx",
            Self::Redirection => "3xx",
            Self::ClientError => "4xx",
            Self::ServerError => "5xx",
        }
    }
}

/// Request counters.
///
/// Everything recorded here also goes to the `metrics` facade; the local
/// counters exist so tests can read them back.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    by_class: [AtomicU64; 5],
    total_duration_us: AtomicU64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, method: &Method, route: &str, status: StatusCode, elapsed: Duration) {
        let class = StatusClass::of(status);
        self.by_class[class as usize].fetch_add(1, Ordering::Relaxed);
        self.total_duration_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        let labels = [
            ("method", method.to_string()),
            ("path", route.to_string()),
            ("status_class", class.label().to_string()),
        ];
        metrics::counter!("flashdeck_http_requests_total", &labels).increment(1);
        metrics::histogram!("flashdeck_http_request_duration_seconds", &labels)
            .record(elapsed.as_secs_f64());
    }

    pub fn count(&self, class: StatusClass) -> u64 {
        self.by_class[class as usize].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.by_class
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_micros(self.total_duration_us.load(Ordering::Relaxed))
    }
}
