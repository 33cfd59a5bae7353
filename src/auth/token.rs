use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the account the token was issued to.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Malformed,
    BadSignature,
    Expired,
}

/// Issues and verifies HS256 bearer tokens.
///
/// Tokens are self-contained: nothing is stored server side, and replacing
/// the secret invalidates every token issued under the old one.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Config("token signing secret cannot be empty".to_string()));
        }

        let max_ttl = Duration::minutes(MAX_TOKEN_TTL_MINUTES);
        if ttl > max_ttl || ttl < -max_ttl {
            return Err(Error::Config(format!(
                "token lifetime must be at most {MAX_TOKEN_TTL_MINUTES} minutes"
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Mints a token naming `username` that expires after the configured TTL.
    pub fn issue(&self, username: &str) -> Result<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::Token("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Token(e.to_string()))
    }

    /// Checks signature and expiry and returns the embedded username.
    pub fn verify(&self, token: &str) -> std::result::Result<String, TokenRejection> {
        use jsonwebtoken::errors::ErrorKind;

        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                ErrorKind::InvalidSignature => TokenRejection::BadSignature,
                _ => TokenRejection::Malformed,
            })
    }
}
