use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::Response};

use crate::app::dto::{ChangePasswordRequest, CredentialsRequest, SessionResponse, WhoAmIResponse};
use crate::app::errors;
use crate::context::SessionContext;
use crate::state::{AppState, blocking};

pub async fn create_session(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Response {
    let result = blocking(&state, move |s| {
        s.write(|tx| s.sessions.create_session(tx, &body.username, &body.password))
    })
    .await;
    errors::respond(StatusCode::CREATED, result.map(SessionResponse::from))
}

pub async fn whoami(Extension(ctx): Extension<SessionContext>) -> Response {
    errors::respond(
        StatusCode::OK,
        Ok(WhoAmIResponse {
            username: ctx.username().to_string(),
            rank: ctx.rank(),
        }),
    )
}

pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Response {
    let token = ctx.token();
    let result =
        blocking(&state, move |s| s.write(|tx| s.sessions.delete_session(tx, token))).await;
    errors::respond_done(result.map(|()| true))
}

pub async fn change_password(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<ChangePasswordRequest>,
) -> Response {
    let result = blocking(&state, move |s| {
        s.write(|tx| {
            s.users
                .change_own_password(tx, ctx.session(), &body.old_password, &body.new_password)
        })
    })
    .await;
    errors::respond_done(result.map(|()| true))
}
