use std::sync::Arc;

use chrono::TimeDelta;

use crate::{
    domain::{
        IdentityId, RepoCreateError, RepoError,
        challenge::{ChallengeRecord, ChallengeSession, ChallengeToken, IntegrityFault, NewChallenge},
    },
    ports::{
        challenge::{ChallengeRepository, ConfirmOutcome},
        clock::Clock,
    },
};

/// Design TTL of a challenge.
pub const DEFAULT_CHALLENGE_TTL: TimeDelta = TimeDelta::minutes(10);

/// Fresh v4 tokens colliding is not a realistic event; the retry only guards
/// against a storage layer reporting a spurious conflict.
const MAX_CREATE_ATTEMPTS: usize = 3;

#[async_trait::async_trait]
pub trait SessionStore {
    async fn create_challenge(&self) -> Result<NewChallenge, SessionStoreError>;
    async fn fetch_live(&self, token: &ChallengeToken) -> Result<ChallengeSession, FetchLiveError>;
    async fn try_confirm(
        &self,
        token: &ChallengeToken,
        identity: IdentityId,
    ) -> Result<(), TryConfirmError>;
}

#[derive(Debug)]
pub enum SessionStoreError {
    StorageError(String),
}

#[derive(Debug)]
pub enum FetchLiveError {
    /// Unknown or expired; deliberately indistinguishable.
    NotFound,
    IntegrityFault(IntegrityFault),
    StorageError(String),
}

#[derive(Debug, PartialEq)]
pub enum TryConfirmError {
    NotFound,
    AlreadyConfirmed,
    StorageError(String),
}

pub struct SessionStoreImpl<R: ChallengeRepository, C: Clock> {
    challenge_repository: Arc<R>,
    clock: Arc<C>,
    challenge_ttl: TimeDelta,
}

impl<R: ChallengeRepository, C: Clock> SessionStoreImpl<R, C> {
    pub fn new(challenge_repository: Arc<R>, clock: Arc<C>, challenge_ttl: TimeDelta) -> Self {
        Self {
            challenge_repository,
            clock,
            challenge_ttl,
        }
    }
}

#[async_trait::async_trait]
impl<R: ChallengeRepository + Send + Sync + 'static, C: Clock + Send + Sync + 'static> SessionStore
    for SessionStoreImpl<R, C>
{
    async fn create_challenge(&self) -> Result<NewChallenge, SessionStoreError> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let record = ChallengeRecord::new_pending(
                ChallengeToken::generate(),
                self.clock.now(),
                self.challenge_ttl,
            );
            match self.challenge_repository.insert(&record).await {
                Ok(()) => {
                    log::debug!(
                        "Created challenge {}… expiring at {}",
                        record.token.log_prefix(),
                        record.expires_at
                    );
                    return Ok(NewChallenge {
                        token: record.token,
                        expires_at: record.expires_at,
                    });
                }
                Err(RepoCreateError::Conflict) => {
                    log::warn!("Challenge token collision, regenerating");
                }
                Err(RepoCreateError::StorageError(e)) => {
                    log::error!("Failed to persist challenge: {}", e);
                    return Err(SessionStoreError::StorageError(e));
                }
            }
        }
        Err(SessionStoreError::StorageError(
            "could not allocate a unique challenge token".to_string(),
        ))
    }

    async fn fetch_live(&self, token: &ChallengeToken) -> Result<ChallengeSession, FetchLiveError> {
        let record = match self.challenge_repository.find(token).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(FetchLiveError::NotFound),
            Err(RepoError::StorageError(e)) => {
                log::error!(
                    "Failed to look up challenge {}…: {}",
                    token.log_prefix(),
                    e
                );
                return Err(FetchLiveError::StorageError(e));
            }
        };
        // Expiry is decided here, at read time, whatever the stored status says.
        if !record.is_live(self.clock.now()) {
            return Err(FetchLiveError::NotFound);
        }
        record.into_session().map_err(|fault| {
            log::error!("{}", fault);
            FetchLiveError::IntegrityFault(fault)
        })
    }

    async fn try_confirm(
        &self,
        token: &ChallengeToken,
        identity: IdentityId,
    ) -> Result<(), TryConfirmError> {
        let now = self.clock.now();
        match self
            .challenge_repository
            .confirm_if_pending(token, identity, now)
            .await
        {
            Ok(ConfirmOutcome::Applied) => {
                log::info!(
                    "Challenge {}… confirmed by identity {}",
                    token.log_prefix(),
                    identity
                );
                Ok(())
            }
            Ok(ConfirmOutcome::AlreadyConfirmed) => {
                log::info!(
                    "Identity {} attempted to confirm already used challenge {}…",
                    identity,
                    token.log_prefix()
                );
                Err(TryConfirmError::AlreadyConfirmed)
            }
            Ok(ConfirmOutcome::NotFound) => Err(TryConfirmError::NotFound),
            Err(RepoError::StorageError(e)) => {
                log::error!(
                    "Failed to confirm challenge {}…: {}",
                    token.log_prefix(),
                    e
                );
                Err(TryConfirmError::StorageError(e))
            }
        }
    }
}
