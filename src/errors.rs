use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sqlx::Error as SqlxError;
use std::env::VarError;
use thiserror::Error;

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid identity token: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),

    #[error("Identity error: {0}")]
    IdentityError(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Pinning service error: {0}")]
    PinningError(String),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::TokenError(_) | AppError::IdentityError(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::DatabaseError(_)
            | AppError::MigrationError(_)
            | AppError::TemplateError(_)
            | AppError::PinningError(_)
            | AppError::HttpClientError(_)
            | AppError::ConfigError(_)
            | AppError::IoError(_)
            | AppError::EnvVarError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
            return HttpResponse::build(status).body(GENERIC_FAILURE);
        }
        HttpResponse::build(status).body(self.to_string())
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}
