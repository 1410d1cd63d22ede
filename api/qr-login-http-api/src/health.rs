use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    name: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}
