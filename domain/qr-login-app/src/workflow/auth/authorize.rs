use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    domain::credential::{Credential, CredentialProfile},
    ports::{
        clock::Clock,
        credential::{CredentialCodec, CredentialVerifyError},
    },
};

/// Guards protected resources. A credential is trusted only when its
/// signature holds, it has not expired, and its profile is one of `accepted`.
pub trait AuthorizeUseCase {
    fn authorize(
        &self,
        bearer: &str,
        accepted: &[CredentialProfile],
    ) -> Result<Credential, AuthorizeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeError {
    InvalidCredential(CredentialVerifyError),
    ProfileNotAccepted(CredentialProfile),
}

impl std::fmt::Display for AuthorizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizeError::InvalidCredential(e) => write!(f, "{}", e),
            AuthorizeError::ProfileNotAccepted(profile) => {
                write!(f, "{} credential not accepted here", profile.as_str())
            }
        }
    }
}

pub(crate) fn verify_credential<K: CredentialCodec>(
    codec: &K,
    bearer: &str,
    now: DateTime<Utc>,
    accepted: &[CredentialProfile],
) -> Result<Credential, AuthorizeError> {
    let credential = codec
        .verify(bearer, now)
        .map_err(AuthorizeError::InvalidCredential)?;
    if !accepted.contains(&credential.profile) {
        return Err(AuthorizeError::ProfileNotAccepted(credential.profile));
    }
    Ok(credential)
}

pub struct AuthorizeUseCaseImpl<K: CredentialCodec, C: Clock> {
    credential_codec: Arc<K>,
    clock: Arc<C>,
}

impl<K: CredentialCodec, C: Clock> AuthorizeUseCaseImpl<K, C> {
    pub fn new(credential_codec: Arc<K>, clock: Arc<C>) -> Self {
        Self {
            credential_codec,
            clock,
        }
    }
}

impl<K: CredentialCodec, C: Clock> AuthorizeUseCase for AuthorizeUseCaseImpl<K, C> {
    fn authorize(
        &self,
        bearer: &str,
        accepted: &[CredentialProfile],
    ) -> Result<Credential, AuthorizeError> {
        verify_credential(
            self.credential_codec.as_ref(),
            bearer,
            self.clock.now(),
            accepted,
        )
        .inspect_err(|e| log::debug!("Rejected bearer credential: {}", e))
    }
}
