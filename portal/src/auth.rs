use anyhow::{Context, Result};
use axum::http::{HeaderMap, header};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    AppState,
    config::AuthConfig,
    error::ApiError,
    storage::{UserRecord, UserRole},
};

type HmacSha256 = Hmac<Sha256>;

const CREDENTIALS_ERROR: &str = "Could not validate credentials";

/// Hash a plain credential with a fresh random salt. Stored form is
/// `<salt>$<hex digest>`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = salted_digest(&salt, password);
    format!("{salt}${digest}")
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) => salted_digest(salt, password) == digest,
        None => false,
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    exp: i64,
}

/// Issues and validates expiring bearer tokens: base64url claims joined
/// with an HMAC-SHA256 signature over them.
pub struct AuthService {
    secret: Vec<u8>,
    token_ttl_minutes: i64,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret_key.as_bytes().to_vec(),
            token_ttl_minutes: config.token_ttl_minutes,
        }
    }

    pub fn issue_token(&self, email: &str) -> Result<String> {
        let claims = TokenClaims {
            sub: email.to_string(),
            exp: Utc::now().timestamp() + self.token_ttl_minutes * 60,
        };
        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).context("failed to encode claims")?);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes())?);
        Ok(format!("{payload}.{signature}"))
    }

    /// Validate a token and return the subject email.
    pub fn verify_token(&self, token: &str) -> Result<String, ApiError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| ApiError::Authentication(CREDENTIALS_ERROR.to_string()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| ApiError::Authentication(CREDENTIALS_ERROR.to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| ApiError::Internal(anyhow::anyhow!(err)))?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| ApiError::Authentication(CREDENTIALS_ERROR.to_string()))?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| ApiError::Authentication(CREDENTIALS_ERROR.to_string()))?;
        let claims: TokenClaims = serde_json::from_slice(&claims_bytes)
            .map_err(|_| ApiError::Authentication(CREDENTIALS_ERROR.to_string()))?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(ApiError::Authentication("Token has expired".to_string()));
        }

        Ok(claims.sub)
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).context("invalid token signing key")?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Resolve the caller from the `Authorization: Bearer <token>` header.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<UserRecord, ApiError> {
    let token = bearer_token(headers)?;
    let email = state.auth.verify_token(token)?;

    let user = state
        .users
        .find_by_email(&email)
        .await
        .map_err(ApiError::Internal)?;

    user.ok_or_else(|| ApiError::Authentication(CREDENTIALS_ERROR.to_string()))
}

pub fn require_admin(user: &UserRecord, action: &str) -> Result<(), ApiError> {
    if user.role != UserRole::Admin {
        return Err(ApiError::Authorization(format!(
            "Only administrators can {action}"
        )));
    }
    Ok(())
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Authentication(CREDENTIALS_ERROR.to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Authentication(CREDENTIALS_ERROR.to_string()))
}
