//! confhub-server library interface
//!
//! Exposes the router and engines for integration testing.

pub mod api;
pub mod auth;
pub mod engine;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use confhub_common::db::DocumentStore;
use tower_http::trace::TraceLayer;

use crate::auth::IdentityVerifier;

/// Application state shared across handlers
///
/// Holds only the store handle and the session verifier; requests share no
/// other state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { store, verifier }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::paper_routes())
        .merge(api::dashboard_routes())
        .merge(api::conference_routes())
        .merge(api::profile_routes())
        .merge(api::reviewer_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
