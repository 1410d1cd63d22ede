use chrono::{DateTime, Utc};

use crate::domain::{
    IdentityId, RepoCreateError, RepoError,
    challenge::{ChallengeRecord, ChallengeToken},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Applied,
    AlreadyConfirmed,
    /// Unknown token, or a row whose `expires_at` has passed.
    NotFound,
}

/// Storage for challenge records.
///
/// `confirm_if_pending` is the one write after creation and must be a single
/// conditional update keyed on `(token, pending, unexpired)`: when several
/// callers race on the same token exactly one may observe `Applied`. Exclusion
/// is per token; unrelated tokens must not contend.
#[async_trait::async_trait]
pub trait ChallengeRepository {
    async fn insert(&self, record: &ChallengeRecord) -> Result<(), RepoCreateError>;
    async fn find(&self, token: &ChallengeToken) -> Result<Option<ChallengeRecord>, RepoError>;
    async fn confirm_if_pending(
        &self,
        token: &ChallengeToken,
        identity: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, RepoError>;
    /// Housekeeping only. Returns the number of rows removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}
