//! Token Guard
//! Mission: Gate protected endpoints on a valid, unrevoked token of the right kind
//!
//! Every check walks the same steps in order:
//! missing token -> undecodable -> expired -> revoked -> wrong kind -> valid.
//! The access and refresh guards differ only in the kind they require.

use crate::auth::{
    jwt::TokenCodec,
    models::{Claims, TokenKind},
    revocation::RevocationStore,
};
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct TokenGuard {
    codec: Arc<TokenCodec>,
    revocations: RevocationStore,
    required: TokenKind,
}

impl TokenGuard {
    pub fn new(codec: Arc<TokenCodec>, revocations: RevocationStore, required: TokenKind) -> Self {
        Self {
            codec,
            revocations,
            required,
        }
    }

    /// Guard for ordinary endpoints
    pub fn access(codec: Arc<TokenCodec>, revocations: RevocationStore) -> Self {
        Self::new(codec, revocations, TokenKind::Access)
    }

    /// Guard for the token refresh endpoint
    pub fn refresh(codec: Arc<TokenCodec>, revocations: RevocationStore) -> Self {
        Self::new(codec, revocations, TokenKind::Refresh)
    }

    pub fn required_kind(&self) -> TokenKind {
        self.required
    }

    fn kind_required(&self) -> AuthError {
        match self.required {
            TokenKind::Access => AuthError::AccessTokenRequired,
            TokenKind::Refresh => AuthError::RefreshTokenRequired,
        }
    }

    /// Validate a bearer token against the current clock
    pub async fn check(&self, bearer: Option<&str>) -> Result<Claims, AuthError> {
        self.check_at(bearer, Utc::now().timestamp()).await
    }

    /// Validate a bearer token as of `now` (unix seconds)
    pub async fn check_at(&self, bearer: Option<&str>, now: i64) -> Result<Claims, AuthError> {
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| self.kind_required())?;

        let claims = self.codec.decode(token)?;

        if claims.is_expired_at(now) {
            return Err(AuthError::InvalidToken);
        }

        if self.revocations.is_revoked(&claims.jti).await? {
            return Err(AuthError::RevokedToken);
        }

        if claims.kind() != self.required {
            return Err(self.kind_required());
        }

        Ok(claims)
    }
}

/// Token from an `Authorization: Bearer <token>` header. Any other scheme counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware that validates the bearer token and stores its claims on the request
pub async fn token_guard_middleware(
    State(guard): State<TokenGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).map(str::to_owned);

    let claims = guard.check(token.as_deref()).await.map_err(|e| {
        warn!(
            path = %req.uri().path(),
            required = guard.required_kind().as_str(),
            code = e.code(),
            "Rejected token"
        );
        e
    })?;

    // Add claims to request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extract claims from request (use after the guard middleware)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}
