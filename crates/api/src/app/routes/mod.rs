use axum::{
    Router,
    response::Response,
    routing::{delete, get, patch, post, put},
};
use warden_core::ClientUid;

use crate::app::errors;

pub mod clients;
pub mod roles;
pub mod session;
pub mod system;
pub mod users;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/session", post(session::create_session))
        .route("/clients/:uid/token", post(clients::issue_token))
}

/// Endpoints that require a bearer session.
pub fn protected_router() -> Router {
    Router::new()
        .route("/session", get(session::whoami).delete(session::logout))
        .route("/session/password", put(session::change_password))
        .route("/users", post(users::create_user).get(users::list_users))
        .route(
            "/users/:username",
            patch(users::update_rank).delete(users::delete_user),
        )
        .route("/users/:username/password", put(users::reset_password))
        .route("/users/:username/sessions", delete(users::revoke_sessions))
        .route("/clients", post(clients::create_client).get(clients::list_clients))
        .route(
            "/clients/:uid",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/clients/:uid/roles", post(roles::create_role).get(roles::list_roles))
        .route(
            "/clients/:uid/roles/:username",
            put(roles::update_role).delete(roles::delete_role),
        )
}

pub(crate) fn parse_uid(raw: &str) -> Result<ClientUid, Response> {
    raw.parse().map_err(|_| errors::bad_path("invalid client uid"))
}
