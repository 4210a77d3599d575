pub mod charge_stations;
pub mod connectors;
pub mod error;
pub mod extract;
pub mod groups;
pub mod v1;

use axum::{
    http::{HeaderValue, StatusCode},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::{app::AppState, config::Config};

pub fn router(state: AppState, cfg: &Config) -> Router {
    with_layers(Router::new().nest("/api/v1", v1::router(state)), cfg)
}

fn with_layers(mut router: Router, cfg: &Config) -> Router {
    if let Some(origin) = &cfg.server.cors_origin {
        match origin.parse::<HeaderValue>() {
            Ok(allowed) => {
                let cors = CorsLayer::new()
                    .allow_origin(AllowOrigin::exact(allowed))
                    .allow_methods([
                        axum::http::Method::GET,
                        axum::http::Method::POST,
                        axum::http::Method::PUT,
                        axum::http::Method::DELETE,
                    ])
                    .allow_headers([axum::http::header::CONTENT_TYPE]);
                router = router.layer(cors);
            }
            Err(e) => warn!(%origin, error = %e, "ignoring invalid CORS origin"),
        }
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(cfg.server.request_timeout_secs),
                )),
        )
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
}
