use warden_core::{Rank, Session, SessionToken};

/// The authenticated session of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    session: Session,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn token(&self) -> SessionToken {
        self.session.token
    }

    pub fn username(&self) -> &str {
        &self.session.username
    }

    pub fn rank(&self) -> Rank {
        self.session.rank
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
