use std::sync::Arc;

use crate::{
    domain::{IdentityId, challenge::ChallengeToken, credential::CredentialProfile},
    ports::{clock::Clock, credential::CredentialCodec},
    services::session_store::{SessionStore, TryConfirmError},
    workflow::auth::authorize::{AuthorizeError, verify_credential},
};

#[async_trait::async_trait]
pub trait ConfirmationCoordinator {
    /// Binds the identity proven by `login_credential` to the challenge.
    /// The session credential is not issued here; the poller picks it up.
    async fn confirm(&self, login_credential: &str, token: &str)
    -> Result<IdentityId, ConfirmError>;
}

#[derive(Debug, PartialEq)]
pub enum ConfirmError {
    Unauthorized(AuthorizeError),
    InvalidOrExpiredChallenge,
    ChallengeAlreadyUsed,
    StorageError(String),
}

pub struct ConfirmationCoordinatorImpl<S: SessionStore, K: CredentialCodec, C: Clock> {
    session_store: Arc<S>,
    credential_codec: Arc<K>,
    clock: Arc<C>,
}

impl<S: SessionStore, K: CredentialCodec, C: Clock> ConfirmationCoordinatorImpl<S, K, C> {
    pub fn new(session_store: Arc<S>, credential_codec: Arc<K>, clock: Arc<C>) -> Self {
        Self {
            session_store,
            credential_codec,
            clock,
        }
    }
}

#[async_trait::async_trait]
impl<
    S: SessionStore + Send + Sync + 'static,
    K: CredentialCodec + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
> ConfirmationCoordinator for ConfirmationCoordinatorImpl<S, K, C>
{
    async fn confirm(
        &self,
        login_credential: &str,
        token: &str,
    ) -> Result<IdentityId, ConfirmError> {
        let credential = verify_credential(
            self.credential_codec.as_ref(),
            login_credential,
            self.clock.now(),
            &[CredentialProfile::Login],
        )
        .map_err(|e| {
            log::debug!("Confirmation rejected: {}", e);
            ConfirmError::Unauthorized(e)
        })?;

        let Some(token) = ChallengeToken::parse(token) else {
            return Err(ConfirmError::InvalidOrExpiredChallenge);
        };

        // The identity comes from the verified credential, never the request.
        let identity = credential.subject;
        match self.session_store.try_confirm(&token, identity).await {
            Ok(()) => Ok(identity),
            Err(TryConfirmError::NotFound) => Err(ConfirmError::InvalidOrExpiredChallenge),
            Err(TryConfirmError::AlreadyConfirmed) => Err(ConfirmError::ChallengeAlreadyUsed),
            Err(TryConfirmError::StorageError(e)) => Err(ConfirmError::StorageError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use crate::{
        domain::credential::CredentialPolicy,
        ports::{clock::ManualClock, credential::CredentialVerifyError},
        services::session_store::{DEFAULT_CHALLENGE_TTL, SessionStoreImpl},
        testing::{MockChallengeRepository, MockCredentialCodec},
    };

    use super::*;

    type Store = SessionStoreImpl<MockChallengeRepository, ManualClock>;

    struct Fixture {
        repo: MockChallengeRepository,
        codec: MockCredentialCodec,
        clock: Arc<ManualClock>,
        store: Arc<Store>,
        coordinator: Arc<ConfirmationCoordinatorImpl<Store, MockCredentialCodec, ManualClock>>,
    }

    fn setup() -> Fixture {
        let repo = MockChallengeRepository::default();
        let codec = MockCredentialCodec::default();
        let clock = Arc::new(ManualClock::at_epoch_secs(1_700_000_000));
        let store = Arc::new(SessionStoreImpl::new(
            Arc::new(repo.clone()),
            clock.clone(),
            DEFAULT_CHALLENGE_TTL,
        ));
        let coordinator = Arc::new(ConfirmationCoordinatorImpl::new(
            store.clone(),
            Arc::new(codec.clone()),
            clock.clone(),
        ));
        Fixture {
            repo,
            codec,
            clock,
            store,
            coordinator,
        }
    }

    impl Fixture {
        fn credential(&self, profile: CredentialProfile, subject: i64) -> String {
            let credential = CredentialPolicy::default().issue(
                profile,
                IdentityId(subject),
                Some(format!("user{}@x.com", subject)),
                self.clock.now(),
            );
            self.codec.sign(&credential).unwrap()
        }
    }

    #[tokio::test]
    async fn test_confirm_binds_credential_subject() {
        let f = setup();
        let created = f.store.create_challenge().await.unwrap();
        let login = f.credential(CredentialProfile::Login, 3);

        assert_eq!(
            f.coordinator.confirm(&login, created.token.as_str()).await,
            Ok(IdentityId(3))
        );
        assert_eq!(
            f.repo.get(&created.token).unwrap().bound_identity,
            Some(IdentityId(3))
        );
    }

    #[tokio::test]
    async fn test_confirm_replay_reports_already_used() {
        let f = setup();
        let created = f.store.create_challenge().await.unwrap();
        let login = f.credential(CredentialProfile::Login, 3);

        f.coordinator
            .confirm(&login, created.token.as_str())
            .await
            .unwrap();
        assert_eq!(
            f.coordinator.confirm(&login, created.token.as_str()).await,
            Err(ConfirmError::ChallengeAlreadyUsed)
        );
    }

    #[tokio::test]
    async fn test_confirm_requires_valid_login_credential() {
        let f = setup();
        let created = f.store.create_challenge().await.unwrap();

        let session = f.credential(CredentialProfile::Session, 3);
        assert_eq!(
            f.coordinator.confirm(&session, created.token.as_str()).await,
            Err(ConfirmError::Unauthorized(
                AuthorizeError::ProfileNotAccepted(CredentialProfile::Session)
            ))
        );

        assert_eq!(
            f.coordinator.confirm("forged", created.token.as_str()).await,
            Err(ConfirmError::Unauthorized(AuthorizeError::InvalidCredential(
                CredentialVerifyError::Malformed
            )))
        );

        let login = f.credential(CredentialProfile::Login, 3);
        f.clock.advance(TimeDelta::minutes(5));
        assert_eq!(
            f.coordinator.confirm(&login, created.token.as_str()).await,
            Err(ConfirmError::Unauthorized(AuthorizeError::InvalidCredential(
                CredentialVerifyError::Expired
            )))
        );

        assert_eq!(f.repo.get(&created.token).unwrap().bound_identity, None);
    }

    #[tokio::test]
    async fn test_confirm_unknown_malformed_or_expired_challenge() {
        let f = setup();
        let created = f.store.create_challenge().await.unwrap();

        f.clock.advance(TimeDelta::minutes(10));
        let login = f.credential(CredentialProfile::Login, 3);

        for token in [
            created.token.as_str().to_string(),
            ChallengeToken::generate().as_str().to_string(),
            "Hello, World!".to_string(),
        ] {
            assert_eq!(
                f.coordinator.confirm(&login, &token).await,
                Err(ConfirmError::InvalidOrExpiredChallenge)
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_confirmers_single_winner() {
        let f = setup();
        let created = f.store.create_challenge().await.unwrap();

        let handles = (1..=8)
            .map(|id| {
                let coordinator = f.coordinator.clone();
                let login = f.credential(CredentialProfile::Login, id);
                let token = created.token.as_str().to_string();
                tokio::spawn(async move { coordinator.confirm(&login, &token).await })
            })
            .collect::<Vec<_>>();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(identity) => winners.push(identity),
                Err(e) => assert_eq!(e, ConfirmError::ChallengeAlreadyUsed),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(
            f.repo.get(&created.token).unwrap().bound_identity,
            Some(winners[0])
        );
    }
}
