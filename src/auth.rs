use std::{
    fmt,
    future::{ready, Ready},
};

use actix_identity::IdentityExt;
use actix_web::{dev::Payload, http::header, web::Data, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{config::IdentityConfig, errors::AppError, utils, AppState};

/// Claims we rely on from the identity provider's session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iss: Option<String>,
}

/// Verifies session tokens issued by the identity provider.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn from_secret(secret: &str, issuer: Option<&str>) -> Self {
        Self::new(
            DecodingKey::from_secret(secret.as_bytes()),
            Algorithm::HS256,
            issuer,
        )
    }

    pub fn from_rsa_pem(pem: &[u8], issuer: Option<&str>) -> Result<Self, AppError> {
        Ok(Self::new(
            DecodingKey::from_rsa_pem(pem)?,
            Algorithm::RS256,
            issuer,
        ))
    }

    /// Prefers the provider's public key when both are configured.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, AppError> {
        let issuer = config.issuer.as_deref();
        if let Some(path) = &config.public_key_path {
            let pem = std::fs::read(path)?;
            return Self::from_rsa_pem(&pem, issuer);
        }
        match &config.jwt_secret {
            Some(secret) => Ok(Self::from_secret(secret, issuer)),
            None => Err(AppError::ConfigError(
                "no identity provider key configured".to_string(),
            )),
        }
    }

    fn new(key: DecodingKey, algorithm: Algorithm, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self { key, validation }
    }

    /// Returns the provider's user id (`sub`) for a valid token.
    pub fn verify(&self, token: &str) -> Result<String, AppError> {
        let data = decode::<Claims>(token.trim(), &self.key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(data.claims.sub)
    }
}

/// The signed-in user, from a bearer token or the session cookie.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub user_id: String,
}

impl CurrentUser {
    /// Identifier stored in `owner_id` and `user_id` columns.
    pub fn owner_id(&self) -> String {
        utils::owner_uuid(&self.user_id)
    }

    fn extract(req: &HttpRequest) -> Result<Self, AppError> {
        if let Some(value) = req.headers().get(header::AUTHORIZATION) {
            let token = value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .ok_or(AppError::Unauthorized)?;
            let state = req.app_data::<Data<AppState>>().ok_or_else(|| {
                AppError::ConfigError("application state not registered".to_string())
            })?;
            let user_id = state.verifier.verify(token).map_err(|e| {
                log::warn!("Rejected bearer token: {}", e);
                e
            })?;
            return Ok(CurrentUser { user_id });
        }

        let identity = req.get_identity().map_err(|_| AppError::Unauthorized)?;
        let user_id = identity
            .id()
            .map_err(|e| AppError::IdentityError(e.to_string()))?;
        Ok(CurrentUser { user_id })
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::extract(req))
    }
}
