//! JWT Token Codec
//! Mission: Issue signed session tokens and decode them back into claims

use crate::auth::models::{Claims, TokenKind, TokenSubject};
use crate::errors::AuthError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Encodes and decodes HMAC-signed session tokens with a single static secret
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    /// Create a codec with the default 1h access / 30d refresh lifetimes
    pub fn new(secret: &str, algorithm: Algorithm) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn default_ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a token for `subject`. `ttl` falls back to the lifetime for `kind`.
    pub fn issue(
        &self,
        subject: &TokenSubject,
        kind: TokenKind,
        ttl: Option<Duration>,
    ) -> Result<String, AuthError> {
        let ttl = ttl.unwrap_or_else(|| self.default_ttl(kind));
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".into()))?
            .timestamp();

        let claims = Claims {
            user: subject.clone(),
            exp,
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            refresh: kind.is_refresh(),
        };

        debug!(
            "Issuing {} token {} for {}, expires in {}s",
            kind.as_str(),
            claims.jti,
            subject.user_id,
            ttl.num_seconds()
        );

        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {e}")))
    }

    /// Verify the signature and structure of `token` and return its claims.
    ///
    /// Expiry is deliberately not enforced here; the token guard compares
    /// `exp` itself so forged and stale tokens stay distinguishable.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let decoded = decode::<Claims>(token, &self.decoding, &self.validation()).map_err(|e| {
            debug!("Rejected token: {}", e);
            AuthError::InvalidToken
        })?;

        Ok(decoded.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        validation
    }
}
