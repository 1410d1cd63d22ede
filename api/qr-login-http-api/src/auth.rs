use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use qr_login_app::domain::credential::{Credential, CredentialProfile};

use crate::{AppState, ServiceError};

/// Raw bearer credential, not yet verified.
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ServiceError::Unauthorized)?;
        Ok(BearerToken(bearer.token().to_string()))
    }
}

/// A verified, unexpired SESSION credential.
pub struct SessionAuth(pub Credential);

impl FromRequestParts<AppState> for SessionAuth {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = parts.extract::<BearerToken>().await?;
        state
            .app
            .authorize_use_case
            .authorize(&token, &[CredentialProfile::Session])
            .map(SessionAuth)
            .map_err(|_| ServiceError::Unauthorized)
    }
}
