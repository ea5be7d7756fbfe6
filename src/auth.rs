//! Authentication
//!
//! Password hashing (bcrypt), bearer token issuance/verification (JWT with an
//! HMAC secret) and the axum middleware that resolves a bearer token into the
//! calling user.

use crate::api::AppState;
use crate::config::AppConfig;
use crate::domain::errors::AppError;
use crate::persistence::models::UserRecord;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Hash a password on the blocking pool
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored bcrypt hash on the blocking pool.
///
/// A corrupt hash counts as a mismatch.
pub async fn verify_password(password: String, hashed: String) -> Result<bool, AppError> {
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?;

    match result {
        Ok(matches) => Ok(matches),
        Err(e) => {
            warn!("Stored password hash could not be verified: {}", e);
            Ok(false)
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::UnsupportedAlgorithm(_) | TokenError::Signing(_) => {
                AppError::Internal(e.to_string())
            }
            _ => AppError::Unauthorized("Could not validate credentials".to_string()),
        }
    }
}

/// Token payload: the subject is the user's email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies signed, time-limited bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenService {
    /// Only the HMAC family is accepted since the key is a shared secret
    pub fn new(secret: &[u8], algorithm: &str, ttl_minutes: i64) -> Result<Self, TokenError> {
        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|_| TokenError::UnsupportedAlgorithm(algorithm.to_string()))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(TokenError::UnsupportedAlgorithm(format!("{:?}", algorithm)));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            ttl: Duration::minutes(ttl_minutes),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, TokenError> {
        Self::new(
            config.secret_key.as_bytes(),
            &config.algorithm,
            config.access_token_expire_minutes,
        )
    }

    #[cfg(test)]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature and structure, then expiry against `now`.
    ///
    /// Zero leeway: the token is rejected from its `exp` second onward.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

/// The authenticated caller, inserted into request extensions by [`require_auth`]
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Middleware to require a valid bearer token on protected routes
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header.map(bearer_token) {
        Some(Some(token)) => token,
        Some(None) => {
            warn!("Invalid Authorization header format (expected Bearer token)");
            return Err(AppError::Unauthorized("Not authenticated".to_string()));
        }
        None => {
            debug!("Missing Authorization header");
            return Err(AppError::Unauthorized("Not authenticated".to_string()));
        }
    };

    let user = state.auth.resolve(token).await?;
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}
