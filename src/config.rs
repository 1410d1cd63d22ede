use std::time::Duration;

use chrono::TimeDelta;
use qr_login_app::{ApplicationConfig, domain::credential::CredentialPolicy};
use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_CHALLENGE_TTL_SECS: u64 = 10 * 60;
const DEFAULT_LOGIN_CREDENTIAL_TTL_SECS: u64 = 5 * 60;
const DEFAULT_SESSION_CREDENTIAL_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_PURGE_INTERVAL_SECS: u64 = 60 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    Sqlite { path: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogFileConfig {
    pub path: String,
    pub archive_pattern: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: Vec<u8>,
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    pub log_file: Option<LogFileConfig>,
    pub application: ApplicationConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let jwt_secret = var("QR_JWT_SECRET")
            .ok_or(ConfigError::Missing("QR_JWT_SECRET"))?
            .into_bytes();

        let host = var("QR_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var("QR_HTTP_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "QR_HTTP_PORT",
                value,
                reason: "expected a port number",
            })?,
            None => DEFAULT_PORT,
        };

        let storage = match var("QR_STORAGE").as_deref().map(str::trim) {
            None | Some("sqlite") => StorageConfig::Sqlite {
                path: var("QR_DB").ok_or(ConfigError::Missing("QR_DB"))?,
            },
            Some("memory") => StorageConfig::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "QR_STORAGE",
                    value: other.to_string(),
                    reason: "expected sqlite or memory",
                });
            }
        };

        let log_file = match (var("LOG_FILE_PATH"), var("LOG_ARCHIVE_PATTERN")) {
            (Some(path), Some(archive_pattern)) => Some(LogFileConfig {
                path,
                archive_pattern,
            }),
            (Some(_), None) => return Err(ConfigError::Missing("LOG_ARCHIVE_PATTERN")),
            _ => None,
        };

        let seconds = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match var(name) {
                Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                    name,
                    value,
                    reason: "expected a whole number of seconds",
                }),
                None => Ok(default),
            }
        };
        let ttl = |name: &'static str, default: u64| -> Result<TimeDelta, ConfigError> {
            let secs = seconds(name, default)?;
            i64::try_from(secs)
                .ok()
                .filter(|&secs| secs > 0)
                .and_then(TimeDelta::try_seconds)
                .ok_or(ConfigError::Invalid {
                    name,
                    value: secs.to_string(),
                    reason: "expected a positive duration",
                })
        };

        let challenge_ttl = ttl("QR_CHALLENGE_TTL_SECS", DEFAULT_CHALLENGE_TTL_SECS)?;
        let credential_policy = CredentialPolicy {
            login_ttl: ttl(
                "QR_LOGIN_CREDENTIAL_TTL_SECS",
                DEFAULT_LOGIN_CREDENTIAL_TTL_SECS,
            )?,
            session_ttl: ttl(
                "QR_SESSION_CREDENTIAL_TTL_SECS",
                DEFAULT_SESSION_CREDENTIAL_TTL_SECS,
            )?,
        };
        let purge_interval = match seconds("QR_PURGE_INTERVAL_SECS", DEFAULT_PURGE_INTERVAL_SECS)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            jwt_secret,
            host,
            port,
            storage,
            log_file,
            application: ApplicationConfig {
                challenge_ttl,
                credential_policy,
                purge_interval,
            },
        })
    }
}
