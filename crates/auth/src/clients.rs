//! Client (relying application) management.
//!
//! Every operation requires the actor's session rank to be at least the
//! configured client-management rank; below it the operation is denied
//! (`None`/`false`) without touching storage.

use serde::Deserialize;
use warden_core::{Client, ClientUid, DataStore, Rank, ServiceError, ServiceResult, TokenType};

use crate::validate;

pub const CLIENT_NOT_FOUND: &str = "client not found";

/// Client fields supplied by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientDraft {
    pub name: String,
    pub redirect_url: String,
    /// Parsed into a [`TokenType`] during validation.
    pub token_type: String,
    pub key_uri: String,
}

impl ClientDraft {
    fn validate(&self) -> ServiceResult<TokenType> {
        validate::client_name(&self.name)?;
        validate::redirect_url(&self.redirect_url)?;
        let token_type = self
            .token_type
            .parse::<TokenType>()
            .map_err(|e| ServiceError::client(e.to_string()))?;
        validate::key_uri(&self.key_uri)?;
        Ok(token_type)
    }

    fn into_client(self, uid: ClientUid, token_type: TokenType) -> Client {
        Client {
            uid,
            name: self.name,
            redirect_url: self.redirect_url,
            token_type,
            key_uri: self.key_uri,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientController {
    management_rank: Rank,
}

impl ClientController {
    pub fn new(management_rank: Rank) -> Self {
        Self { management_rank }
    }

    fn may_manage(&self, actor_rank: Rank) -> bool {
        actor_rank >= self.management_rank
    }

    pub fn create_client<S>(
        &self,
        store: &S,
        actor_rank: Rank,
        draft: ClientDraft,
    ) -> ServiceResult<Option<Client>>
    where
        S: DataStore + ?Sized,
    {
        if !self.may_manage(actor_rank) {
            return Ok(None);
        }
        let token_type = draft.validate()?;
        let client = draft.into_client(ClientUid::new(), token_type);
        store
            .create_client(&client)
            .map_err(|e| ServiceError::internal("error creating client", e))?;
        tracing::info!(client_uid = %client.uid, name = %client.name, "client created");
        Ok(Some(client))
    }

    pub fn list_clients<S>(&self, store: &S, actor_rank: Rank) -> ServiceResult<Option<Vec<Client>>>
    where
        S: DataStore + ?Sized,
    {
        if !self.may_manage(actor_rank) {
            return Ok(None);
        }
        store
            .get_all_clients()
            .map(Some)
            .map_err(|e| ServiceError::internal("error listing clients", e))
    }

    pub fn get_client<S>(
        &self,
        store: &S,
        actor_rank: Rank,
        uid: ClientUid,
    ) -> ServiceResult<Option<Client>>
    where
        S: DataStore + ?Sized,
    {
        if !self.may_manage(actor_rank) {
            return Ok(None);
        }
        fetch_client(store, uid).map(Some)
    }

    pub fn update_client<S>(
        &self,
        store: &S,
        actor_rank: Rank,
        uid: ClientUid,
        draft: ClientDraft,
    ) -> ServiceResult<bool>
    where
        S: DataStore + ?Sized,
    {
        if !self.may_manage(actor_rank) {
            return Ok(false);
        }
        let token_type = draft.validate()?;
        let client = draft.into_client(uid, token_type);
        let found = store
            .update_client(&client)
            .map_err(|e| ServiceError::internal("error updating client", e))?;
        if !found {
            return Err(ServiceError::client(CLIENT_NOT_FOUND));
        }
        tracing::info!(client_uid = %uid, "client updated");
        Ok(true)
    }

    pub fn delete_client<S>(
        &self,
        store: &S,
        actor_rank: Rank,
        uid: ClientUid,
    ) -> ServiceResult<bool>
    where
        S: DataStore + ?Sized,
    {
        if !self.may_manage(actor_rank) {
            return Ok(false);
        }
        let found = store
            .delete_client(uid)
            .map_err(|e| ServiceError::internal("error deleting client", e))?;
        if !found {
            return Err(ServiceError::client(CLIENT_NOT_FOUND));
        }
        tracing::info!(client_uid = %uid, "client deleted");
        Ok(true)
    }
}

pub(crate) fn fetch_client<S>(store: &S, uid: ClientUid) -> ServiceResult<Client>
where
    S: DataStore + ?Sized,
{
    store
        .get_client_by_uid(uid)
        .map_err(|e| ServiceError::internal("error fetching client", e))?
        .ok_or_else(|| ServiceError::client(CLIENT_NOT_FOUND))
}
