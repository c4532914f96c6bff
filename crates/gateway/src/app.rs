//! Router and shared state

use crate::handlers;
use crate::middleware::{rate_limit, track_metrics};
use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use dispatch_common::{config::AppConfig, db::DispatchStore, errors::Result};
use dispatch_processor::DispatchProcessor;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Path of the processor invocation endpoint
pub const PROCESS_PATH: &str = "/functions/v1/dispatch-file-processor";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DispatchStore>,
    pub processor: Arc<DispatchProcessor>,
}

/// Create the main application router
pub fn create_router(state: AppState) -> Result<Router> {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut api_routes = Router::new()
        .route(PROCESS_PATH, post(handlers::dispatch::process_file))
        .route("/v1/files", post(handlers::files::register_file))
        .route(
            "/v1/jobs/{job_id}/files/{file_id}/progress",
            get(handlers::progress::file_progress),
        )
        .route_layer(from_fn(track_metrics));

    if config.rate_limit.enabled {
        let limiter = rate_limit::create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        )?;
        api_routes = api_routes.layer(from_fn_with_state(limiter, rate_limit::rate_limit_middleware));
    }

    // Compose the app; probes stay outside the rate limit
    Ok(Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use dispatch_common::testing::{MemoryStore, StaticBlobs};
    use dispatch_processor::ProcessingSettings;
    use tower::ServiceExt;

    pub fn state(store: Arc<MemoryStore>, blobs: StaticBlobs) -> AppState {
        state_with(store, blobs, ProcessingSettings::default())
    }

    pub fn state_with(
        store: Arc<MemoryStore>,
        blobs: StaticBlobs,
        settings: ProcessingSettings,
    ) -> AppState {
        let processor = DispatchProcessor::new(store.clone(), Arc::new(blobs), settings);
        AppState {
            config: Arc::new(AppConfig::default()),
            store,
            processor: Arc::new(processor),
        }
    }

    pub async fn send(state: AppState, request: Request<Body>) -> Response<Body> {
        create_router(state).unwrap().oneshot(request).await.unwrap()
    }

    pub async fn json_body(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    pub fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
