use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
};
use warden_auth::ClientDraft;

use super::parse_uid;
use crate::app::dto::{CredentialsRequest, RedirectResponse};
use crate::app::errors;
use crate::context::SessionContext;
use crate::state::{AppState, blocking};

pub async fn issue_token(
    Extension(state): Extension<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(body): Json<CredentialsRequest>,
) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let result = blocking(&state, move |s| {
        s.read(|ex| {
            s.issuer
                .issue_redirect_token(ex, uid, &body.username, &body.password)
        })
    })
    .await;
    errors::respond(
        StatusCode::OK,
        result.map(|redirect_url| RedirectResponse { redirect_url }),
    )
}

pub async fn create_client(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(draft): Json<ClientDraft>,
) -> Response {
    let result = blocking(&state, move |s| {
        s.write(|tx| s.clients.create_client(tx, ctx.rank(), draft))
    })
    .await;
    errors::respond_permitted(StatusCode::CREATED, result)
}

pub async fn list_clients(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Response {
    let result =
        blocking(&state, move |s| s.read(|ex| s.clients.list_clients(ex, ctx.rank()))).await;
    errors::respond_permitted(StatusCode::OK, result)
}

pub async fn get_client(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(uid): Path<String>,
) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let result = blocking(&state, move |s| {
        s.read(|ex| s.clients.get_client(ex, ctx.rank(), uid))
    })
    .await;
    errors::respond_permitted(StatusCode::OK, result)
}

pub async fn update_client(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(uid): Path<String>,
    Json(draft): Json<ClientDraft>,
) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let result = blocking(&state, move |s| {
        s.write(|tx| s.clients.update_client(tx, ctx.rank(), uid, draft))
    })
    .await;
    errors::respond_done(result)
}

pub async fn delete_client(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(uid): Path<String>,
) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let result = blocking(&state, move |s| {
        s.write(|tx| s.clients.delete_client(tx, ctx.rank(), uid))
    })
    .await;
    errors::respond_done(result)
}
