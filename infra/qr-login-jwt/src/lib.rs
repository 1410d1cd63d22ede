use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use qr_login_app::{
    domain::{
        IdentityId,
        credential::{Credential, CredentialProfile},
    },
    ports::credential::{CredentialCodec, CredentialSignError, CredentialVerifyError},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
    typ: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    handle: Option<String>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// HS256 credentials signed with a shared secret fixed at construction.
///
/// Expiry is not left to the library: `exp` is checked against the `now`
/// handed in by the caller, so the application clock is the only authority.
pub struct JwtCredentialCodec {
    keys: Keys,
    validation: Validation,
}

impl JwtCredentialCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            keys: Keys::new(secret),
            validation,
        }
    }
}

impl CredentialCodec for JwtCredentialCodec {
    fn sign(&self, credential: &Credential) -> Result<String, CredentialSignError> {
        let claims = Claims {
            sub: credential.subject.to_string(),
            iat: credential.issued_at.timestamp(),
            exp: credential.expires_at.timestamp(),
            typ: credential.profile.as_str().to_string(),
            handle: credential.handle.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| CredentialSignError(e.to_string()))
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Credential, CredentialVerifyError> {
        let data = decode::<Claims>(token, &self.keys.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    CredentialVerifyError::BadSignature
                }
                ErrorKind::ExpiredSignature => CredentialVerifyError::Expired,
                _ => CredentialVerifyError::Malformed,
            }
        })?;
        let claims = data.claims;

        let subject = claims
            .sub
            .parse::<IdentityId>()
            .map_err(|_| CredentialVerifyError::Malformed)?;
        let profile =
            CredentialProfile::parse(&claims.typ).ok_or(CredentialVerifyError::Malformed)?;
        let issued_at =
            DateTime::from_timestamp(claims.iat, 0).ok_or(CredentialVerifyError::Malformed)?;
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(CredentialVerifyError::Malformed)?;

        let credential = Credential {
            subject,
            handle: claims.handle,
            profile,
            issued_at,
            expires_at,
        };
        if !credential.is_valid_at(now) {
            return Err(CredentialVerifyError::Expired);
        }
        Ok(credential)
    }
}
