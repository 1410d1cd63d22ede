use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    domain::{
        challenge::{ChallengeState, ChallengeToken, IntegrityFault},
        credential::{CredentialPolicy, CredentialProfile, IssuedCredential},
    },
    ports::{clock::Clock, credential::CredentialCodec},
    services::session_store::{FetchLiveError, SessionStore},
};

/// Anonymous status view for whoever holds the challenge token.
#[async_trait::async_trait]
pub trait PollingGateway {
    async fn poll(&self, token: &str) -> Result<PollOutcome, PollError>;
}

#[derive(Debug, PartialEq)]
pub enum PollOutcome {
    Pending {
        expires_at: DateTime<Utc>,
    },
    /// Every poll after confirmation mints a fresh session credential.
    Confirmed {
        session_credential: IssuedCredential,
    },
}

#[derive(Debug)]
pub enum PollError {
    InvalidOrExpiredChallenge,
    IntegrityFault(IntegrityFault),
    StorageError(String),
    SigningError(String),
}

pub struct PollingGatewayImpl<S: SessionStore, K: CredentialCodec, C: Clock> {
    session_store: Arc<S>,
    credential_codec: Arc<K>,
    clock: Arc<C>,
    policy: CredentialPolicy,
}

impl<S: SessionStore, K: CredentialCodec, C: Clock> PollingGatewayImpl<S, K, C> {
    pub fn new(
        session_store: Arc<S>,
        credential_codec: Arc<K>,
        clock: Arc<C>,
        policy: CredentialPolicy,
    ) -> Self {
        Self {
            session_store,
            credential_codec,
            clock,
            policy,
        }
    }
}

#[async_trait::async_trait]
impl<
    S: SessionStore + Send + Sync + 'static,
    K: CredentialCodec + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
> PollingGateway for PollingGatewayImpl<S, K, C>
{
    async fn poll(&self, token: &str) -> Result<PollOutcome, PollError> {
        let Some(token) = ChallengeToken::parse(token) else {
            return Err(PollError::InvalidOrExpiredChallenge);
        };
        let session = match self.session_store.fetch_live(&token).await {
            Ok(session) => session,
            Err(FetchLiveError::NotFound) => return Err(PollError::InvalidOrExpiredChallenge),
            Err(FetchLiveError::IntegrityFault(fault)) => {
                return Err(PollError::IntegrityFault(fault));
            }
            Err(FetchLiveError::StorageError(e)) => return Err(PollError::StorageError(e)),
        };

        match session.state {
            ChallengeState::Pending => Ok(PollOutcome::Pending {
                expires_at: session.expires_at,
            }),
            ChallengeState::Confirmed { bound_identity } => {
                let credential = self.policy.issue(
                    CredentialProfile::Session,
                    bound_identity,
                    None,
                    self.clock.now(),
                );
                let signed = self.credential_codec.sign(&credential).map_err(|e| {
                    log::error!("{}", e);
                    PollError::SigningError(e.0)
                })?;
                log::debug!(
                    "Issued session credential for identity {} via challenge {}…",
                    bound_identity,
                    token.log_prefix()
                );
                Ok(PollOutcome::Confirmed {
                    session_credential: IssuedCredential {
                        token: signed,
                        expires_at: credential.expires_at,
                    },
                })
            }
        }
    }
}
