use std::sync::{Arc, LazyLock};

use crate::{
    domain::{
        RepoError,
        credential::{CredentialPolicy, CredentialProfile, IssuedCredential},
    },
    ports::{clock::Clock, credential::CredentialCodec, identity::IdentityRepository},
};

/// Verified against when the handle is unknown, so a miss costs the same
/// bcrypt work as a wrong secret.
static DUMMY_VERIFIER: LazyLock<Option<String>> =
    LazyLock::new(|| bcrypt::hash("qr-login-absent-identity", bcrypt::DEFAULT_COST).ok());

#[async_trait::async_trait]
pub trait PasswordAuthenticator {
    async fn authenticate(&self, handle: &str, secret: &str)
    -> Result<IssuedCredential, LoginError>;
}

#[derive(Debug, PartialEq)]
pub enum LoginError {
    IdentityNotFound,
    SecretMismatch,
    StorageError(String),
    SigningError(String),
}

impl LoginError {
    /// Both variants are reported to the caller as the same failure.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, LoginError::IdentityNotFound | LoginError::SecretMismatch)
    }
}

pub struct PasswordAuthenticatorImpl<I: IdentityRepository, K: CredentialCodec, C: Clock> {
    identity_repository: Arc<I>,
    credential_codec: Arc<K>,
    clock: Arc<C>,
    policy: CredentialPolicy,
}

impl<I: IdentityRepository, K: CredentialCodec, C: Clock> PasswordAuthenticatorImpl<I, K, C> {
    pub fn new(
        identity_repository: Arc<I>,
        credential_codec: Arc<K>,
        clock: Arc<C>,
        policy: CredentialPolicy,
    ) -> Self {
        // Hash the dummy verifier on the blocking pool now, not on the first miss.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn_blocking(|| LazyLock::force(&DUMMY_VERIFIER));
        }
        Self {
            identity_repository,
            credential_codec,
            clock,
            policy,
        }
    }
}

/// Runs both the verifier lookup and the bcrypt check on the blocking pool.
async fn verify_secret(
    secret: &str,
    verifier: impl FnOnce() -> Option<String> + Send + 'static,
) -> bool {
    let secret = secret.to_string();
    let verified = tokio::task::spawn_blocking(move || match verifier() {
        Some(verifier) => bcrypt::verify(secret, &verifier),
        None => Ok(false),
    })
    .await;
    match verified {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            log::error!("Unusable secret verifier: {}", e);
            false
        }
        Err(e) => {
            log::error!("Secret verification task failed: {}", e);
            false
        }
    }
}

#[async_trait::async_trait]
impl<
    I: IdentityRepository + Send + Sync + 'static,
    K: CredentialCodec + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
> PasswordAuthenticator for PasswordAuthenticatorImpl<I, K, C>
{
    async fn authenticate(
        &self,
        handle: &str,
        secret: &str,
    ) -> Result<IssuedCredential, LoginError> {
        let identity = match self.identity_repository.find_by_handle(handle).await {
            Ok(identity) => identity,
            Err(RepoError::StorageError(e)) => {
                log::error!("Failed to look up identity: {}", e);
                return Err(LoginError::StorageError(e));
            }
        };

        let Some(identity) = identity else {
            verify_secret(secret, || DUMMY_VERIFIER.clone()).await;
            log::debug!("Login rejected: unknown handle");
            return Err(LoginError::IdentityNotFound);
        };

        let verifier = identity.secret_verifier.clone();
        if !verify_secret(secret, move || Some(verifier)).await {
            log::debug!("Login rejected: secret mismatch for identity {}", identity.id);
            return Err(LoginError::SecretMismatch);
        }

        let credential = self.policy.issue(
            CredentialProfile::Login,
            identity.id,
            Some(identity.handle),
            self.clock.now(),
        );
        let token = self.credential_codec.sign(&credential).map_err(|e| {
            log::error!("{}", e);
            LoginError::SigningError(e.0)
        })?;
        log::info!("Identity {} logged in", identity.id);
        Ok(IssuedCredential {
            token,
            expires_at: credential.expires_at,
        })
    }
}
