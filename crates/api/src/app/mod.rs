//! HTTP application wiring.
//!
//! - `services.rs`: stores, ledger, sessions and the shared operations
//! - `routes/`: handlers, one file per role group
//! - `dto.rs`: request bodies, views and the JSON envelope
//! - `errors.rs`: the single error type and its status mapping

use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use scholaris_auth::AuthError;

use crate::config::ApiConfig;
use crate::middleware::{self, AuthState, GateState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the router over fresh in-memory services.
pub fn build_app(config: &ApiConfig) -> Result<(Router, Arc<AppServices>), AuthError> {
    let services = Arc::new(AppServices::in_memory(config)?);
    Ok((build_app_with_services(services.clone()), services))
}

/// Gate order: identity, then tenant isolation and subscription, then the
/// handler's own role policy. Public routes skip all of them.
pub fn build_app_with_services(services: Arc<AppServices>) -> Router {
    let auth_state = AuthState {
        tokens: services.tokens.clone(),
        directory: services.directory.clone(),
    };
    let gate_state = GateState {
        registry: services.registry.clone(),
    };

    let gated = routes::gated_router().route_layer(axum::middleware::from_fn_with_state(
        gate_state,
        middleware::gate_middleware,
    ));

    let protected = gated
        .merge(routes::auth::session_router())
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    let api = protected
        .merge(routes::auth::public_router())
        .route("/health", get(routes::system::health));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", api)
        .layer(Extension(services))
        .layer(TraceLayer::new_for_http())
}
