//! HS256 JWT issuing and validation.

use std::collections::HashSet;
use std::time::Duration;

use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

const DEFAULT_ACCESS_LIFETIME: Duration = Duration::from_secs(30 * 60);
const DEFAULT_REFRESH_LIFETIME: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Distinguishes short-lived access tokens from long-lived refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Public claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub user_id: u64,
    pub actions: HashSet<String>,
    pub network_ids: HashSet<String>,
    pub device_ids: HashSet<String>,
}

/// Internal claim set: payload plus the token type and expiration the
/// validator requires.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    payload: TokenPayload,
    token_type: TokenType,
    exp: u64,
}

/// Result of successfully validating a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    pub payload: TokenPayload,
    pub token_type: TokenType,
}

/// Token validation or signing failure. Deliberately coarse: callers treat
/// every variant as "not authenticated".
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Issues and validates HS256-signed tokens.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl JwtTokenService {
    /// Creates a service signing with `secret`, using the default 30 minute
    /// access / 30 day refresh lifetimes.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock slack: an expired token is expired.
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_lifetime: DEFAULT_ACCESS_LIFETIME,
            refresh_lifetime: DEFAULT_REFRESH_LIFETIME,
        }
    }

    /// Overrides the token lifetimes.
    #[must_use]
    pub fn with_lifetimes(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_lifetime = access;
        self.refresh_lifetime = refresh;
        self
    }

    /// Issues a short-lived access token for `payload`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue_access_token(&self, payload: TokenPayload) -> Result<String, AuthError> {
        self.issue(payload, TokenType::Access, self.access_lifetime)
    }

    /// Issues a long-lived refresh token for `payload`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue_refresh_token(&self, payload: TokenPayload) -> Result<String, AuthError> {
        self.issue(payload, TokenType::Refresh, self.refresh_lifetime)
    }

    fn issue(
        &self,
        payload: TokenPayload,
        token_type: TokenType,
        lifetime: Duration,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            payload,
            token_type,
            exp: get_current_timestamp() + lifetime.as_secs(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Validates `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// Fails closed on any defect: bad signature, wrong algorithm, expired,
    /// or missing the expiration or token-type claims.
    pub fn parse(&self, token: &str) -> Result<ParsedToken, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(ParsedToken {
            payload: data.claims.payload,
            token_type: data.claims.token_type,
        })
    }
}
