use std::{env, fmt::Display, str::FromStr};

use crate::errors::AppError;

/// Cookie keys shorter than this make `actix_web::cookie::Key::from` panic.
const MIN_SESSION_KEY_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session_key: String,
    pub idp: IdentityConfig,
    pub pinning: PinningConfig,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    pub jwt_secret: Option<String>,
    pub public_key_path: Option<String>,
    pub issuer: Option<String>,
    pub publishable_key: String,
}

#[derive(Debug, Clone)]
pub struct PinningConfig {
    pub api_url: String,
    pub api_key: String,
    pub secret_key: String,
    pub gateway: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let session_key = env::var("SESSION_KEY").map_err(|e| {
            log::error!("FATAL: SESSION_KEY environment variable not set");
            AppError::EnvVarError(e)
        })?;
        if session_key.len() < MIN_SESSION_KEY_LEN {
            return Err(AppError::ConfigError(format!(
                "SESSION_KEY must be at least {MIN_SESSION_KEY_LEN} bytes"
            )));
        }

        let idp = IdentityConfig {
            jwt_secret: optional("IDP_JWT_SECRET"),
            public_key_path: optional("IDP_PUBLIC_KEY_PATH"),
            issuer: optional("IDP_ISSUER"),
            publishable_key: optional("IDP_PUBLISHABLE_KEY").unwrap_or_default(),
        };
        if idp.jwt_secret.is_none() && idp.public_key_path.is_none() {
            return Err(AppError::ConfigError(
                "one of IDP_JWT_SECRET or IDP_PUBLIC_KEY_PATH must be set".to_string(),
            ));
        }

        let pinning = PinningConfig {
            api_url: with_default("PINATA_API_URL", "https://api.pinata.cloud"),
            api_key: optional("PINATA_API_KEY").unwrap_or_default(),
            secret_key: optional("PINATA_SECRET_KEY").unwrap_or_default(),
            gateway: with_default("PINATA_GATEWAY", "https://gateway.pinata.cloud"),
        };
        if pinning.api_key.is_empty() || pinning.secret_key.is_empty() {
            log::warn!("Pinning credentials not set, image uploads will fail");
        }

        Ok(Self {
            database_url: with_default("DATABASE_URL", "sqlite://hostel_finder.db"),
            host: with_default("HOST", "0.0.0.0"),
            port: parse_or("PORT", 8080)?,
            session_key,
            idp,
            pinning,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn with_default(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(key) {
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid {key} value: {e}"))),
    }
}
