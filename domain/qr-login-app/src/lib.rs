use std::{sync::Arc, time::Duration};

use chrono::TimeDelta;
use tokio::task::JoinHandle;

use crate::{
    domain::credential::CredentialPolicy,
    ports::{
        challenge::ChallengeRepository, clock::Clock, credential::CredentialCodec,
        identity::IdentityRepository,
    },
    processes::purge_expired::PurgeExpiredChallengesJob,
    services::session_store::{DEFAULT_CHALLENGE_TTL, SessionStoreImpl},
    workflow::{
        auth::{
            authorize::{AuthorizeUseCase, AuthorizeUseCaseImpl},
            login::{PasswordAuthenticator, PasswordAuthenticatorImpl},
        },
        challenge::{
            confirm::{ConfirmationCoordinator, ConfirmationCoordinatorImpl},
            create::{CreateChallengeUseCase, CreateChallengeUseCaseImpl},
            poll::{PollingGateway, PollingGatewayImpl},
        },
    },
};

pub mod domain;
pub mod ports;
pub mod processes;
pub mod services;
pub mod workflow;

#[cfg(test)]
mod testing;

#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    pub challenge_ttl: TimeDelta,
    pub credential_policy: CredentialPolicy,
    /// `None` disables the housekeeping job.
    pub purge_interval: Option<Duration>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
            credential_policy: CredentialPolicy::default(),
            purge_interval: Some(Duration::from_secs(60 * 60)),
        }
    }
}

pub struct Application {
    pub jobs: Option<JoinHandle<()>>,

    pub login_use_case: Box<dyn PasswordAuthenticator + Send + Sync + 'static>,
    pub authorize_use_case: Box<dyn AuthorizeUseCase + Send + Sync + 'static>,

    pub challenge_create_use_case: Box<dyn CreateChallengeUseCase + Send + Sync + 'static>,
    pub challenge_poll_use_case: Box<dyn PollingGateway + Send + Sync + 'static>,
    pub challenge_confirm_use_case: Box<dyn ConfirmationCoordinator + Send + Sync + 'static>,
}

pub fn build_application<
    I: IdentityRepository + Send + Sync + 'static,
    R: ChallengeRepository + Send + Sync + 'static,
    K: CredentialCodec + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
>(
    identity_repository: Arc<I>,
    challenge_repository: Arc<R>,
    credential_codec: Arc<K>,
    clock: Arc<C>,
    config: ApplicationConfig,
) -> Application {
    let session_store = Arc::new(SessionStoreImpl::new(
        challenge_repository.clone(),
        clock.clone(),
        config.challenge_ttl,
    ));

    let jobs = config.purge_interval.map(|interval| {
        let purge_job =
            PurgeExpiredChallengesJob::new(challenge_repository.clone(), clock.clone(), interval);
        tokio::spawn(async move { purge_job.run().await })
    });

    Application {
        jobs,
        login_use_case: Box::new(PasswordAuthenticatorImpl::new(
            identity_repository.clone(),
            credential_codec.clone(),
            clock.clone(),
            config.credential_policy,
        )),
        authorize_use_case: Box::new(AuthorizeUseCaseImpl::new(
            credential_codec.clone(),
            clock.clone(),
        )),
        challenge_create_use_case: Box::new(CreateChallengeUseCaseImpl::new(
            session_store.clone(),
        )),
        challenge_poll_use_case: Box::new(PollingGatewayImpl::new(
            session_store.clone(),
            credential_codec.clone(),
            clock.clone(),
            config.credential_policy,
        )),
        challenge_confirm_use_case: Box::new(ConfirmationCoordinatorImpl::new(
            session_store,
            credential_codec,
            clock,
        )),
    }
}
