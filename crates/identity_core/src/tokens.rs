//! crates/identity_core/src/tokens.rs
//!
//! Signed access and refresh tokens (HS256 JWTs).
//!
//! The two kinds use separate secrets and carry a `typ` claim, so a token of one
//! kind never verifies as the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{TokenPair, UserAccount};

const ACCESS_KIND: &str = "access";
const REFRESH_KIND: &str = "refresh";

/// Token issuer error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token expired")]
    Expired,
    #[error("Token is malformed")]
    Malformed,
    #[error("Token generation failed: {0}")]
    Signing(String),
}

/// Non-sensitive profile fields embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileClaims {
    pub username: String,
    pub email: String,
    pub full_name: String,
}

/// Claims of a short-lived access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID (subject)
    pub sub: Uuid,
    #[serde(flatten)]
    pub profile: ProfileClaims,
    /// Unique token id; keeps two tokens minted in the same second distinct.
    pub jti: Uuid,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a long-lived refresh token. Carries the user id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

/// Secrets and lifetimes for both token kinds.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Mints and verifies session tokens.
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(settings: &TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            access: SigningKeys::from_secret(&settings.access_secret),
            refresh: SigningKeys::from_secret(&settings.refresh_secret),
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
            validation,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        profile: ProfileClaims,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id,
            profile,
            jti: Uuid::new_v4(),
            typ: ACCESS_KIND.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.access.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            typ: REFRESH_KIND.to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.refresh.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Mints a fresh access/refresh pair for `account`.
    pub fn issue_pair(&self, account: &UserAccount) -> Result<TokenPair, TokenError> {
        let profile = ProfileClaims {
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
        };
        Ok(TokenPair {
            access_token: self.issue_access_token(account.id, profile)?,
            refresh_token: self.issue_refresh_token(account.id)?,
        })
    }

    /// Verifies an access token and returns its claims.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode_with(token, &self.access.decoding)?;
        if claims.typ != ACCESS_KIND {
            return Err(TokenError::Malformed);
        }
        Ok(claims)
    }

    /// Verifies a refresh token and returns the user id it was issued to.
    pub fn verify_refresh_token(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims: RefreshClaims = self.decode_with(token, &self.refresh.decoding)?;
        if claims.typ != REFRESH_KIND {
            return Err(TokenError::Malformed);
        }
        Ok(claims.sub)
    }

    fn decode_with<T: DeserializeOwned>(
        &self,
        token: &str,
        key: &DecodingKey,
    ) -> Result<T, TokenError> {
        decode::<T>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}
