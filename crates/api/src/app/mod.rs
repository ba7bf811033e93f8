//! Router assembly.

use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn_with_state};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::session_middleware;
use crate::state::AppState;

pub mod dto;
pub mod errors;
pub mod routes;

pub fn build_app(state: Arc<AppState>) -> Router {
    // route_layer: unknown methods on protected paths still get 405, not 401.
    let protected = routes::protected_router()
        .route_layer(from_fn_with_state(Arc::clone(&state), session_middleware));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(Extension(state)),
        )
}
