//! HTTP transport for the sentir analysis engine.
//!
//! The router is built here so integration tests can drive it without
//! binding a socket; `main.rs` only wires logging, configuration and the
//! listener.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use sentir_core::defaults;
use sentir_engine::Engine;

pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// Builds the application router with its middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Analysis
        .route("/api", get(handlers::analyse).post(handlers::analyse))
        .route("/api/", get(handlers::analyse).post(handlers::analyse))
        // Plugins
        .route("/api/plugins", get(handlers::list_plugins))
        .route("/api/plugins/", get(handlers::list_plugins))
        .route("/api/plugins/:name", get(handlers::plugin_info))
        .route("/api/plugins/:name/", get(handlers::plugin_info))
        .route("/api/plugins/:name/activate", post(handlers::activate_plugin))
        .route("/api/plugins/:name/deactivate", post(handlers::deactivate_plugin))
        // Published JSON-LD context
        .route("/api/contexts/:name", get(handlers::context))
        .route("/health", get(handlers::health_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CatchPanicLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
        .layer(RequestBodyLimitLayer::new(defaults::MAX_REQUEST_BYTES))
        .with_state(state)
}
