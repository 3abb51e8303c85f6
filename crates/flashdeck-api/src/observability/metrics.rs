//! Prometheus exposition for the `metrics` facade.
//!
//! Request metrics are recorded by the observe middleware, query metrics by
//! the postgres store. [`CATALOGUE`] lists every series with its help text.

use std::sync::Arc;

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Counter,
    Histogram,
}

/// Every series the server emits: name, kind, unit, help.
const CATALOGUE: &[(&str, Kind, Unit, &str)] = &[
    (
        "flashdeck_http_requests_total",
        Kind::Counter,
        Unit::Count,
        "HTTP requests by method, route and status class",
    ),
    (
        "flashdeck_http_request_duration_seconds",
        Kind::Histogram,
        Unit::Seconds,
        "HTTP request latency by method, route and status class",
    ),
    (
        "flashdeck_storage_query_duration_seconds",
        Kind::Histogram,
        Unit::Seconds,
        "Postgres query latency by operation and outcome",
    ),
    (
        "flashdeck_storage_query_timeout_total",
        Kind::Counter,
        Unit::Count,
        "Postgres queries abandoned after the query timeout",
    ),
    (
        "flashdeck_storage_health_check_duration_seconds",
        Kind::Histogram,
        Unit::Seconds,
        "Latency of the readiness probe against Postgres",
    ),
];

/// Cloneable handle onto the installed recorder, used as `/metrics` state.
#[derive(Clone)]
pub struct MetricsState {
    handle: Arc<PrometheusHandle>,
}

impl MetricsState {
    pub fn new(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("a global metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Installs the process-wide Prometheus recorder and registers the
/// catalogue's descriptions with it.
pub fn init_metrics() -> Result<MetricsState, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsError::AlreadyInstalled)?;
    describe_catalogue();
    Ok(MetricsState::new(handle))
}

fn describe_catalogue() {
    for &(name, kind, unit, help) in CATALOGUE {
        match kind {
            Kind::Counter => metrics::describe_counter!(name, unit, help),
            Kind::Histogram => metrics::describe_histogram!(name, unit, help),
        }
    }
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Only one recorder can be installed per process, so these tests build
    // a local recorder instead of calling `init_metrics`.

    #[test]
    fn test_catalogue_names_are_unique_and_prefixed() {
        let mut names: Vec<&str> = CATALOGUE.iter().map(|(name, ..)| *name).collect();
        assert!(names.iter().all(|name| name.starts_with("flashdeck_")));
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOGUE.len());
    }

    #[test]
    fn test_described_series_render_help_text() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = MetricsState::new(recorder.handle());

        metrics::with_local_recorder(&recorder, || {
            describe_catalogue();
            metrics::counter!("flashdeck_storage_query_timeout_total", "operation" => "get_set")
                .increment(1);
        });

        let output = state.render();
        assert!(output.contains("# HELP flashdeck_storage_query_timeout_total"));
        assert!(output.contains("operation=\"get_set\""));
    }

    #[test]
    fn test_render_includes_recorded_metric() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = MetricsState::new(recorder.handle());

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("flashdeck_http_requests_total", "method" => "GET").increment(2);
        });

        let output = state.render();
        assert!(output.contains("flashdeck_http_requests_total"));
    }

    #[tokio::test]
    async fn test_metrics_handler_sets_content_type() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = MetricsState::new(recorder.handle());

        let response = metrics_handler(State(state)).await.into_response();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            PROMETHEUS_CONTENT_TYPE
        );
    }
}
