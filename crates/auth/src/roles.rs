//! Per-client user roles.
//!
//! The actor must outrank the user the role belongs to; a failed check
//! returns `false` and persists nothing.

use warden_core::{ClientUid, DataStore, Rank, ServiceError, ServiceResult, StoreError, UserRole};

use crate::clients::fetch_client;
use crate::rank::verify_rank;
use crate::validate;

pub const ROLE_EXISTS: &str = "user already has a role for this client";
pub const ROLE_NOT_FOUND: &str = "user role not found";

pub fn create_user_role<S>(
    store: &S,
    actor_rank: Rank,
    client_uid: ClientUid,
    username: &str,
    role: &str,
) -> ServiceResult<bool>
where
    S: DataStore + ?Sized,
{
    fetch_client(store, client_uid)?;
    if !verify_rank(store, username, actor_rank)? {
        return Ok(false);
    }
    validate::role(role)?;

    let existing = store
        .get_user_role_by_client_and_username(client_uid, username)
        .map_err(|e| ServiceError::internal("error fetching user role", e))?;
    if existing.is_some() {
        return Err(ServiceError::client(ROLE_EXISTS));
    }

    let user_role = UserRole {
        client_uid,
        username: username.to_string(),
        role: role.to_string(),
    };
    store.create_user_role(&user_role).map_err(|e| match e {
        StoreError::Duplicate(_) => ServiceError::client(ROLE_EXISTS),
        e => ServiceError::internal("error creating user role", e),
    })?;
    tracing::info!(%client_uid, %username, %role, "user role created");
    Ok(true)
}

/// Roles on `client_uid` held by users the actor outranks.
pub fn list_user_roles<S>(
    store: &S,
    actor_rank: Rank,
    client_uid: ClientUid,
) -> ServiceResult<Vec<UserRole>>
where
    S: DataStore + ?Sized,
{
    fetch_client(store, client_uid)?;
    store
        .get_user_roles_with_lesser_rank_by_client(client_uid, actor_rank)
        .map_err(|e| ServiceError::internal("error listing user roles", e))
}

pub fn update_user_role<S>(
    store: &S,
    actor_rank: Rank,
    client_uid: ClientUid,
    username: &str,
    role: &str,
) -> ServiceResult<bool>
where
    S: DataStore + ?Sized,
{
    if !verify_rank(store, username, actor_rank)? {
        return Ok(false);
    }
    validate::role(role)?;
    let user_role = UserRole {
        client_uid,
        username: username.to_string(),
        role: role.to_string(),
    };
    let found = store
        .update_user_role(&user_role)
        .map_err(|e| ServiceError::internal("error updating user role", e))?;
    if !found {
        return Err(ServiceError::client(ROLE_NOT_FOUND));
    }
    tracing::info!(%client_uid, %username, %role, "user role updated");
    Ok(true)
}

pub fn delete_user_role<S>(
    store: &S,
    actor_rank: Rank,
    client_uid: ClientUid,
    username: &str,
) -> ServiceResult<bool>
where
    S: DataStore + ?Sized,
{
    if !verify_rank(store, username, actor_rank)? {
        return Ok(false);
    }
    let found = store
        .delete_user_role(client_uid, username)
        .map_err(|e| ServiceError::internal("error deleting user role", e))?;
    if !found {
        return Err(ServiceError::client(ROLE_NOT_FOUND));
    }
    tracing::info!(%client_uid, %username, "user role deleted");
    Ok(true)
}
