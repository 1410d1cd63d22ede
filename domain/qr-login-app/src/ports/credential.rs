use chrono::{DateTime, Utc};

use crate::domain::credential::Credential;

/// Signs and verifies bearer credentials. Implementations hold their key
/// material from construction on; nothing is looked up per call.
pub trait CredentialCodec {
    fn sign(&self, credential: &Credential) -> Result<String, CredentialSignError>;

    /// Rejects on bad signature, malformed structure, or `now >= expires_at`.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Credential, CredentialVerifyError>;
}

#[derive(Debug)]
pub struct CredentialSignError(pub String);

impl std::fmt::Display for CredentialSignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to sign credential: {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialVerifyError {
    Malformed,
    BadSignature,
    Expired,
}

impl std::fmt::Display for CredentialVerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialVerifyError::Malformed => write!(f, "Malformed credential"),
            CredentialVerifyError::BadSignature => write!(f, "Credential signature mismatch"),
            CredentialVerifyError::Expired => write!(f, "Credential expired"),
        }
    }
}
