use std::sync::Arc;

use log::info;
use qr_login_app::{
    build_application,
    ports::{challenge::ChallengeRepository, clock::SystemClock, identity::IdentityRepository},
};
use qr_login_jwt::JwtCredentialCodec;
use qr_login_persistence::{
    memory::{MemoryChallengeRepository, MemoryIdentityRepository},
    sqlite::{
        challenges::SqliteChallengeRepository, identities::SqliteIdentityRepository,
        open_database,
    },
};

use crate::config::{ServerConfig, StorageConfig};

mod config;
mod logs;

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received. Preparing graceful exit...");
}

async fn serve<
    I: IdentityRepository + Send + Sync + 'static,
    R: ChallengeRepository + Send + Sync + 'static,
>(
    config: ServerConfig,
    identity_repository: Arc<I>,
    challenge_repository: Arc<R>,
) {
    let credential_codec = Arc::new(JwtCredentialCodec::new(&config.jwt_secret));
    let app = Arc::new(build_application(
        identity_repository,
        challenge_repository,
        credential_codec,
        Arc::new(SystemClock),
        config.application,
    ));

    info!("Starting application");

    if let Err(e) =
        qr_login_http_api::run(app.clone(), &config.host, config.port, shutdown_signal()).await
    {
        log::error!("HTTP API failed: {}", e);
    }

    if let Some(jobs) = &app.jobs {
        jobs.abort();
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env().expect("Invalid configuration");

    let _log_handle =
        logs::init_logger(config.log_file.as_ref()).expect("Failed to initialize logger");

    match config.storage.clone() {
        StorageConfig::Sqlite { path } => {
            let pool = open_database(&path)
                .await
                .expect("Failed to open the sqlite database");
            info!("Using sqlite storage at {}", path);
            serve(
                config,
                Arc::new(SqliteIdentityRepository::new(pool.clone())),
                Arc::new(SqliteChallengeRepository::new(pool)),
            )
            .await;
        }
        StorageConfig::Memory => {
            info!("Using in-memory storage; all state is lost on exit");
            serve(
                config,
                Arc::new(MemoryIdentityRepository::new()),
                Arc::new(MemoryChallengeRepository::new()),
            )
            .await;
        }
    }
}
