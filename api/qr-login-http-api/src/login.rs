use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppState, ServiceError};

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    handle: String,
    #[serde(alias = "password")]
    secret: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    login_credential: String,
    expires_at: DateTime<Utc>,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let Json(payload) = payload.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    let issued = state
        .app
        .login_use_case
        .authenticate(&payload.handle, &payload.secret)
        .await?;
    Ok(Json(LoginResponse {
        login_credential: issued.token,
        expires_at: issued.expires_at,
    }))
}
