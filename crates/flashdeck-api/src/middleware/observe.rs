//! Per-request observation: request id, tracing span, access log, metrics.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};

use axum::{
    extract::MatchedPath,
    http::{Request, Response},
};
use tower::{Layer, Service};
use tracing::{field::Empty, info, info_span, warn, Instrument, Span};

use super::metrics::RequestMetrics;
use super::request_id::{RequestId, REQUEST_ID_HEADER};

const LOG_TARGET: &str = "flashdeck::http";

/// Route label for requests no route matched.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Wraps every request in an `http_request` span and logs its start and
/// completion. It also assigns the request id and echoes it in the response,
/// and records the outcome into the shared [`RequestMetrics`].
///
/// Apply it with `Router::layer` so the matched route is known.
#[derive(Clone)]
pub struct ObserveLayer {
    metrics: Arc<RequestMetrics>,
}

impl ObserveLayer {
    pub fn new(metrics: Arc<RequestMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for ObserveLayer {
    type Service = ObserveService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ObserveService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ObserveService<S> {
    inner: S,
    metrics: Arc<RequestMetrics>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ObserveService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let request_id = RequestId::from_headers(request.headers());
        let header = request_id.header_value();
        if let Some(value) = &header {
            request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
        }

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());

        let span = info_span!(
            "http_request",
            method = %method,
            route = %route,
            request_id = %request_id,
            http.status_code = Empty,
        );
        request.extensions_mut().insert(request_id);

        let metrics = self.metrics.clone();
        let started = Instant::now();
        // Call the clone that was polled ready
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(
            async move {
                info!(target: LOG_TARGET, path = %path, "request started");

                let mut response = inner.call(request).await?;
                let elapsed = started.elapsed();
                let status = response.status();
                Span::current().record("http.status_code", status.as_u16());

                metrics.record(&method, &route, status, elapsed);

                let duration_ms = elapsed.as_millis() as u64;
                if status.is_server_error() {
                    warn!(
                        target: LOG_TARGET,
                        path = %path,
                        status = status.as_u16(),
                        duration_ms,
                        "request failed"
                    );
                } else {
                    info!(
                        target: LOG_TARGET,
                        path = %path,
                        status = status.as_u16(),
                        duration_ms,
                        "request completed"
                    );
                }

                if let Some(value) = header {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
