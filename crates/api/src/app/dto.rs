use serde::{Deserialize, Serialize};
use warden_core::{Rank, Session};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub username: String,
    pub rank: Rank,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token.to_string(),
            username: session.username,
            rank: session.rank,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub username: String,
    pub rank: Rank,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub redirect_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub rank: Rank,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRankRequest {
    pub rank: Rank,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}
