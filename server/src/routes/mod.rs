mod devices;
mod tenants;

use crate::middlewares::request_id::{RequestId, RequestIdLayer};
use crate::state::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};
use std::time::Duration;
use tracing::Span;

pub fn build() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(|| async { StatusCode::OK }))
        .route(
            "/api/version",
            get(|| async { format!("deviceadm_{}", env!("CARGO_PKG_VERSION")) }),
        )
        // ======== devices ========
        .route(
            "/api/0.1.0/devices",
            get(devices::list).post(devices::submit),
        )
        .route(
            "/api/0.1.0/devices/{id}",
            get(devices::get).delete(devices::delete),
        )
        .route(
            "/api/0.1.0/devices/{id}/status",
            get(devices::get_status).put(devices::update_status),
        )
        // ======== internal ========
        .route("/api/internal/v1/devadm/tenants", post(tenants::create))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestId>()
                        .map(|it| it.to_string())
                        .unwrap_or_default();
                    tracing::info_span!("request", request_id = %request_id)
                })
                .on_request(|req: &Request<Body>, _span: &Span| {
                    tracing::trace!(
                        method = %req.method(),
                        uri = %req.uri(),
                        version = %format!("{:?}", req.version()),
                        "started processing request"
                    );
                })
                .on_response(|res: &Response, latency: Duration, _span: &Span| {
                    tracing::trace!(
                        status = ?res.status(),
                        latency = %format!("{}ms", latency.as_millis()),
                        "finished processing request"
                    );
                }),
        )
        .layer(RequestIdLayer::new())
}
