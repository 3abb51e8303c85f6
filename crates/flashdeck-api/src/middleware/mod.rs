//! API middleware: request observation and CORS.

mod metrics;
mod observe;
mod request_id;

pub use metrics::{RequestMetrics, StatusClass};
pub use observe::{ObserveLayer, ObserveService};
pub use request_id::{RequestId, REQUEST_ID_HEADER};

use axum::http::Method;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

/// Creates a CORS layer that mirrors the request origin and allows
/// credentials, so browser clients on another origin can send the session
/// cookie.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}
