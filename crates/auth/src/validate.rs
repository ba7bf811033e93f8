//! Field validation shared by the management controllers.

use url::Url;
use warden_core::model::{
    MAX_CLIENT_NAME_LEN, MAX_KEY_URI_LEN, MAX_REDIRECT_URL_LEN, MAX_ROLE_LEN, MAX_USERNAME_LEN,
};
use warden_core::{ServiceError, ServiceResult};

fn bounded(value: &str, max: usize, message: &str) -> ServiceResult<()> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(ServiceError::client(message));
    }
    Ok(())
}

pub(crate) fn username(value: &str) -> ServiceResult<()> {
    bounded(
        value,
        MAX_USERNAME_LEN,
        "username must be between 1 and 30 characters",
    )
}

pub(crate) fn client_name(value: &str) -> ServiceResult<()> {
    bounded(
        value,
        MAX_CLIENT_NAME_LEN,
        "client name must be between 1 and 30 characters",
    )
}

pub(crate) fn key_uri(value: &str) -> ServiceResult<()> {
    bounded(value, MAX_KEY_URI_LEN, "key uri must be between 1 and 100 characters")
}

pub(crate) fn role(value: &str) -> ServiceResult<()> {
    bounded(value, MAX_ROLE_LEN, "role must be between 1 and 15 characters")
}

/// Redirect targets must be absolute http(s) URLs.
pub(crate) fn redirect_url(value: &str) -> ServiceResult<()> {
    bounded(
        value,
        MAX_REDIRECT_URL_LEN,
        "redirect url must be between 1 and 100 characters",
    )?;
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ServiceError::client("redirect url must be an absolute http(s) url")),
    }
}
