use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use qr_login_app::workflow::challenge::poll::PollOutcome;
use serde::{Deserialize, Serialize};

use crate::{AppState, ServiceError, auth::BearerToken};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

pub async fn create(State(state): State<AppState>) -> Result<Json<ChallengeResponse>, ServiceError> {
    let challenge = state
        .app
        .challenge_create_use_case
        .create_challenge()
        .await?;
    Ok(Json(ChallengeResponse {
        token: challenge.token.to_string(),
        expires_at: challenge.expires_at,
    }))
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusResponse {
    Pending,
    #[serde(rename_all = "camelCase")]
    Confirmed {
        session_credential: String,
        expires_at: DateTime<Utc>,
    },
}

pub async fn status(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ServiceError> {
    let response = match state.app.challenge_poll_use_case.poll(&token).await? {
        PollOutcome::Pending { .. } => StatusResponse::Pending,
        PollOutcome::Confirmed { session_credential } => StatusResponse::Confirmed {
            session_credential: session_credential.token,
            expires_at: session_credential.expires_at,
        },
    };
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    token: String,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    status: &'static str,
}

pub async fn confirm(
    BearerToken(login_credential): BearerToken,
    State(state): State<AppState>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<ConfirmResponse>, ServiceError> {
    let Json(payload) = payload.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    state
        .app
        .challenge_confirm_use_case
        .confirm(&login_credential, &payload.token)
        .await?;
    Ok(Json(ConfirmResponse {
        status: "confirmed",
    }))
}
