use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::openapi;
use super::AppState;
use crate::rpc::streamable_http_service;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_body_bytes = state.config.server.max_body_bytes;

    let mut router = Router::new()
        .route("/recognize", post(handlers::recognize))
        .route("/supported-languages", get(handlers::supported_languages))
        .route("/settings", post(handlers::update_settings))
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json));

    if state.config.rpc.enabled {
        let rpc_service = streamable_http_service(state.service.clone());
        router = router.nest_service(&state.config.rpc.path, rpc_service);
    }

    router
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
