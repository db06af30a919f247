use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::models::User;
use crate::services::TokenPair;

/// What a token is good for. Refresh tokens are only accepted on the refresh
/// endpoint; access tokens everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub is_system_admin: bool,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User, is_system_admin: bool, kind: TokenKind) -> Self {
        let now = Utc::now();
        let security = &config::config().security;
        let ttl = match kind {
            TokenKind::Access => Duration::minutes(security.access_token_expiry_mins as i64),
            TokenKind::Refresh => Duration::days(security.refresh_token_expiry_days as i64),
        };

        Self {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_system_admin,
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token generation error: {0}")]
    Generation(String),
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("wrong token kind")]
    WrongKind,
    #[error("token secret not configured")]
    MissingSecret,
}

/// Signing and verification keys derived from one shared secret. Carried in
/// `AppState` so the gate and the auth service agree on signatures.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_secret(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Keys from the config singleton; the usual path for the binary.
    pub fn from_config() -> Result<Self, TokenError> {
        Self::from_secret(&config::config().security.token_secret)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Mint the access/refresh pair issued on login and refresh.
    pub fn mint_pair(&self, user: &User, is_system_admin: bool) -> Result<TokenPair, TokenError> {
        let access = self.sign(&Claims::new(user, is_system_admin, TokenKind::Access))?;
        let refresh = self.sign(&Claims::new(user, is_system_admin, TokenKind::Refresh))?;
        Ok(TokenPair { access_token: access, refresh_token: refresh })
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        if data.claims.kind != expected {
            return Err(TokenError::WrongKind);
        }
        Ok(data.claims)
    }
}
