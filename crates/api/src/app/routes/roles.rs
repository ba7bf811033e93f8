use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use warden_auth::roles;

use super::parse_uid;
use crate::app::dto::{CreateRoleRequest, UpdateRoleRequest};
use crate::app::errors;
use crate::context::SessionContext;
use crate::state::{AppState, blocking};

pub async fn create_role(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(uid): Path<String>,
    Json(body): Json<CreateRoleRequest>,
) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let result = blocking(&state, move |s| {
        s.write(|tx| roles::create_user_role(tx, ctx.rank(), uid, &body.username, &body.role))
    })
    .await;
    match result {
        Ok(true) => StatusCode::CREATED.into_response(),
        other => errors::respond_done(other),
    }
}

pub async fn list_roles(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(uid): Path<String>,
) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let result = blocking(&state, move |s| {
        s.read(|ex| roles::list_user_roles(ex, ctx.rank(), uid))
    })
    .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn update_role(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path((uid, username)): Path<(String, String)>,
    Json(body): Json<UpdateRoleRequest>,
) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let result = blocking(&state, move |s| {
        s.write(|tx| roles::update_user_role(tx, ctx.rank(), uid, &username, &body.role))
    })
    .await;
    errors::respond_done(result)
}

pub async fn delete_role(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path((uid, username)): Path<(String, String)>,
) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let result = blocking(&state, move |s| {
        s.write(|tx| roles::delete_user_role(tx, ctx.rank(), uid, &username))
    })
    .await;
    errors::respond_done(result)
}
