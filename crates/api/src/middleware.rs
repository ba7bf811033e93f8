use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use warden_core::{ErrorKind, SessionToken};

use crate::app::errors;
use crate::context::SessionContext;
use crate::state::{AppState, blocking};

/// Resolves the bearer session token and injects a [`SessionContext`].
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()).and_then(|t| t.parse::<SessionToken>().ok()) {
        Some(token) => token,
        None => return unauthorized(),
    };

    let resolved = blocking(&state, move |s| s.read(|ex| s.sessions.get_session(ex, token))).await;
    match resolved {
        Ok(session) => {
            req.extensions_mut().insert(SessionContext::new(session));
            next.run(req).await
        }
        Err(e) if e.kind() == ErrorKind::Client => unauthorized(),
        Err(e) => errors::service_error(e),
    }
}

fn unauthorized() -> Response {
    errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing or invalid session")
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
