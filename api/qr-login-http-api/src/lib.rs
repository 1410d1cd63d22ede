use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::info;
use qr_login_app::{
    Application,
    workflow::{
        auth::login::LoginError,
        challenge::{confirm::ConfirmError, create::CreateChallengeError, poll::PollError},
    },
};
use thiserror::Error;
use tower_http::cors::CorsLayer;

mod auth;
mod challenge;
mod health;
mod login;
mod protected;


#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
}

pub fn router(app: Arc<Application>) -> Router {
    Router::new()
        .route("/login", post(login::login))
        .route("/challenge", get(challenge::create))
        .route("/challenge/{token}/status", get(challenge::status))
        .route("/confirm", post(challenge::confirm))
        .route("/protected", get(protected::protected))
        .route("/health", get(health::health))
        .layer(CorsLayer::permissive())
        .with_state(AppState { app })
}

pub async fn run(
    app: Arc<Application>,
    host: &str,
    port: u16,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;

    info!("HTTP API listening on {}:{}", host, port);
    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("HTTP API shut down gracefully");
    Ok(())
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired challenge")]
    InvalidOrExpiredChallenge,

    #[error("challenge already used")]
    ChallengeAlreadyUsed,

    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    /// The detail is logged, never sent.
    #[error("internal error")]
    Internal(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::InvalidCredentials
            | ServiceError::InvalidOrExpiredChallenge
            | ServiceError::ChallengeAlreadyUsed
            | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Internal(detail) => {
                log::error!("Request failed: {}", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<LoginError> for ServiceError {
    fn from(value: LoginError) -> Self {
        match value {
            LoginError::IdentityNotFound | LoginError::SecretMismatch => {
                ServiceError::InvalidCredentials
            }
            LoginError::StorageError(e) | LoginError::SigningError(e) => ServiceError::Internal(e),
        }
    }
}

impl From<CreateChallengeError> for ServiceError {
    fn from(value: CreateChallengeError) -> Self {
        match value {
            CreateChallengeError::StorageError(e) => ServiceError::Internal(e),
        }
    }
}

impl From<PollError> for ServiceError {
    fn from(value: PollError) -> Self {
        match value {
            PollError::InvalidOrExpiredChallenge => ServiceError::InvalidOrExpiredChallenge,
            PollError::IntegrityFault(fault) => ServiceError::Internal(fault.to_string()),
            PollError::StorageError(e) | PollError::SigningError(e) => ServiceError::Internal(e),
        }
    }
}

impl From<ConfirmError> for ServiceError {
    fn from(value: ConfirmError) -> Self {
        match value {
            ConfirmError::Unauthorized(_) => ServiceError::Unauthorized,
            ConfirmError::InvalidOrExpiredChallenge => ServiceError::InvalidOrExpiredChallenge,
            ConfirmError::ChallengeAlreadyUsed => ServiceError::ChallengeAlreadyUsed,
            ConfirmError::StorageError(e) => ServiceError::Internal(e),
        }
    }
}
