//! REST backend for a property-rental marketplace.

pub mod auth;
pub mod config;
pub mod database;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod uploads;

#[cfg(test)]
pub(crate) mod test_support;

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;

use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Hide credentials before anything is traced.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(tracing::Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(Any),
        );

    let uploads = ServeDir::new(state.uploads.root());

    Router::new()
        .route("/", get(|| async { "Rental Marketplace API" }))
        .route("/health", get(health_check))
        .nest("/api", routes::create_router(&state))
        .nest_service("/uploads", uploads)
        .with_state(state)
        .layer(middleware)
}

async fn health_check() -> &'static str {
    "OK"
}
