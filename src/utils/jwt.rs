use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived, sent as `Authorization: Bearer`
    Access,
    /// Long-lived, only accepted by the refresh endpoint
    Refresh,
}

/// JWT claims carried by both token types.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i32, username: &str, token_type: TokenType, valid_for_hours: i64) -> Self {
        let now = Timestamp::now();
        let exp = now
            .checked_add(SignedDuration::from_hours(valid_for_hours))
            .unwrap_or(now);

        Self {
            sub: user_id.to_string(),
            username: username.to_string(),
            token_type,
            iat: now.as_second(),
            exp: exp.as_second(),
        }
    }

    /// The user id encoded in `sub`.
    pub fn user_id(&self) -> AppResult<i32> {
        self.sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid token subject"))
    }
}

/// An access token together with the refresh token that renews it.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

pub fn generate_token(
    user_id: i32,
    username: &str,
    token_type: TokenType,
    secret: &str,
    valid_for_hours: i64,
) -> AppResult<String> {
    let claims = Claims::new(user_id, username, token_type, valid_for_hours);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal {
        source: anyhow::anyhow!("Failed to generate JWT token: {}", e),
    })
}

/// Issues a fresh access/refresh pair using the configured lifetimes.
pub fn generate_token_pair(user_id: i32, username: &str, config: &JwtConfig) -> AppResult<TokenPair> {
    let access_token = generate_token(
        user_id,
        username,
        TokenType::Access,
        &config.secret,
        config.access_token_expiration,
    )?;
    let refresh_token = generate_token(
        user_id,
        username,
        TokenType::Refresh,
        &config.secret,
        config.refresh_token_expiration,
    )?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: config.access_token_expiration * 3600,
    })
}

/// Decodes a token, checking signature, expiry and type.
pub fn validate_token(token: &str, secret: &str, expected: TokenType) -> AppResult<Claims> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::unauthorized("Token has expired"),
        ErrorKind::InvalidSignature => AppError::unauthorized("Invalid token signature"),
        ErrorKind::InvalidToken => AppError::unauthorized("Invalid token"),
        _ => AppError::unauthorized(format!("Token validation failed: {}", e)),
    })?;

    if claims.token_type != expected {
        return Err(AppError::unauthorized(format!(
            "Invalid token type: expected {:?}, got {:?}",
            expected, claims.token_type
        )));
    }

    Ok(claims)
}

pub fn validate_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    validate_token(token, secret, TokenType::Access)
}

pub fn validate_refresh_token(token: &str, secret: &str) -> AppResult<Claims> {
    validate_token(token, secret, TokenType::Refresh)
}
