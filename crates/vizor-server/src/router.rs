//! Main application router.

use crate::{
    controllers::{async_event_controller, health_controller},
    middleware::logging_middleware,
    state::AppState,
};
use axum::{http::HeaderValue, middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use vizor_async_queries::{async_channel_middleware, AsyncQueryManagerInterface};
use vizor_config::ServerConfig;

/// Creates the main application router.
///
/// The channel cookie middleware wraps every route when the manager asks
/// for request handlers.
pub fn create_router(
    async_queries: Arc<dyn AsyncQueryManagerInterface>,
    server_config: &ServerConfig,
) -> Router {
    let state = AppState::new(Arc::clone(&async_queries));

    let api_router = async_event_controller::router().with_state(state);

    let mut router = Router::new()
        .merge(health_controller::router())
        .nest("/api/v1", api_router)
        .route("/", get(root));

    if async_queries.register_request_handlers() {
        router = router.layer(middleware::from_fn_with_state(
            async_queries,
            async_channel_middleware,
        ));
        info!("Async channel middleware installed");
    }

    apply_server_layers(router, server_config)
}

/// Timeout, CORS, tracing and request logging around every route.
fn apply_server_layers(router: Router, server_config: &ServerConfig) -> Router {
    router
        .layer(TimeoutLayer::new(server_config.request_timeout()))
        .layer(create_cors_layer(server_config))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging_middleware))
}

/// Creates a CORS layer based on server configuration.
fn create_cors_layer(server_config: &ServerConfig) -> CorsLayer {
    if !server_config.cors_enabled {
        return CorsLayer::new();
    }
    if server_config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server_config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> &'static str {
    "Vizor API v1"
}
