//! Rank-based permission checks.
//!
//! An actor may only act on subjects whose rank is strictly below its own, and
//! may never grant a rank equal to or above its own. A failed check is a
//! regular outcome (`false`/`None`), not an error.

use warden_core::{Rank, ServiceError, ServiceResult, UserStore};

pub const USER_NOT_FOUND: &str = "user not found";

/// Whether `actor_rank` may act on the user `subject_username`.
pub fn verify_rank<S>(store: &S, subject_username: &str, actor_rank: Rank) -> ServiceResult<bool>
where
    S: UserStore + ?Sized,
{
    let subject = store
        .get_user_by_username(subject_username)
        .map_err(|e| ServiceError::internal("error fetching user", e))?
        .ok_or_else(|| ServiceError::client(USER_NOT_FOUND))?;
    Ok(actor_rank.outranks(subject.rank))
}

/// Whether `actor_rank` may assign `requested` to anyone.
pub fn may_assign(actor_rank: Rank, requested: Rank) -> bool {
    actor_rank.outranks(requested)
}
