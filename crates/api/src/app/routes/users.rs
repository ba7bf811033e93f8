use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
};

use crate::app::dto::{CreateUserRequest, ResetPasswordRequest, UpdateRankRequest};
use crate::app::errors;
use crate::context::SessionContext;
use crate::state::{AppState, blocking};

pub async fn create_user(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<CreateUserRequest>,
) -> Response {
    let result = blocking(&state, move |s| {
        s.write(|tx| {
            s.users
                .create_user(tx, ctx.rank(), &body.username, &body.password, body.rank)
        })
    })
    .await;
    errors::respond_permitted(StatusCode::CREATED, result)
}

pub async fn list_users(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Response {
    let result = blocking(&state, move |s| s.read(|ex| s.users.list_users(ex, ctx.rank()))).await;
    errors::respond(StatusCode::OK, result)
}

pub async fn update_rank(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(username): Path<String>,
    Json(body): Json<UpdateRankRequest>,
) -> Response {
    let result = blocking(&state, move |s| {
        s.write(|tx| s.users.update_user_rank(tx, ctx.rank(), &username, body.rank))
    })
    .await;
    errors::respond_done(result)
}

pub async fn reset_password(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(username): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> Response {
    let result = blocking(&state, move |s| {
        s.write(|tx| s.users.update_user_password(tx, ctx.rank(), &username, &body.password))
    })
    .await;
    errors::respond_done(result)
}

pub async fn delete_user(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(username): Path<String>,
) -> Response {
    let result = blocking(&state, move |s| {
        s.write(|tx| s.users.delete_user(tx, ctx.rank(), &username))
    })
    .await;
    errors::respond_done(result)
}

pub async fn revoke_sessions(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(username): Path<String>,
) -> Response {
    let result = blocking(&state, move |s| {
        s.write(|tx| s.sessions.delete_user_sessions(tx, ctx.rank(), &username))
    })
    .await;
    errors::respond_done(result)
}
