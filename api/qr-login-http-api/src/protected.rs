use axum::Json;
use serde::Serialize;

use crate::auth::SessionAuth;

#[derive(Serialize)]
pub struct ProtectedResponse {
    message: String,
    subject: i64,
}

pub async fn protected(SessionAuth(credential): SessionAuth) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: format!("Authenticated as identity {}", credential.subject),
        subject: credential.subject.0,
    })
}
