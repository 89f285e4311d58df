use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authentication pipeline, leaves first.
pub mod token;
pub mod exemption;
pub mod identity;
pub mod authorization;
pub mod pipeline;

pub mod error;
pub mod models;
pub mod repository;
pub mod config;
pub mod handlers;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AuthError, ErrorBody};
pub use models::{AuthorizationContext, Role};
pub use pipeline::{AuthPipeline, PipelineState, RequestFacts, auth_middleware};
pub use repository::{PostgresRepository, RepositoryState};
pub use token::{Claims, TokenVerifier};

use identity::IdentityResolver;

/// AppState
///
/// The single, immutable container shared by every request: the identity storage handle
/// and the authentication pipeline built around it.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub pipeline: PipelineState,
}

impl AppState {
    /// Wires the pipeline from its immutable parts.
    pub fn new(repo: RepositoryState, verifier: TokenVerifier, config: &AppConfig) -> Self {
        let pipeline = AuthPipeline::new(
            verifier,
            config.exemptions.clone(),
            IdentityResolver::new(repo.clone()),
        );
        Self {
            repo,
            pipeline: Arc::new(pipeline),
        }
    }
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, applies the auth pipeline to the guarded routes and
/// the observability layers to everything.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(public::public_routes())
        // `route_layer` runs after routing, so the middleware sees the matched route
        // template and its path parameters.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagged with the `x-request-id` header so every log line
/// of one request (including pipeline rejections) can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
