//! Role-based access control on top of a validated access token.
//!
//! The role embedded in the token is only a hint; the gate always re-reads
//! the stored user so a downgrade applies before the token expires.

use crate::auth::{
    guard::extract_claims,
    models::{Claims, User, UserRole},
    resolver::IdentityResolver,
};
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct RoleGate {
    resolver: IdentityResolver,
    allowed: Arc<[UserRole]>,
}

impl RoleGate {
    pub fn new(resolver: IdentityResolver, allowed: impl Into<Vec<UserRole>>) -> Self {
        let allowed: Vec<UserRole> = allowed.into();
        Self {
            resolver,
            allowed: allowed.into(),
        }
    }

    pub fn permits(&self, role: UserRole) -> bool {
        self.allowed.contains(&role)
    }

    /// Resolve the token's user and admit it only if its stored role is allowed
    pub async fn check(&self, claims: &Claims) -> Result<User, AuthError> {
        let user = self.resolver.resolve(&claims.user).await?;

        if !self.permits(user.role) {
            warn!(
                "User {} with role {} denied (allowed: {:?})",
                user.id,
                user.role.as_str(),
                self.allowed
            );
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(user)
    }
}

/// Middleware enforcing a role gate; must run after the access guard.
/// The resolved user is stored on the request for the handler.
pub async fn role_gate_middleware(
    State(gate): State<RoleGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = extract_claims(&req)
        .cloned()
        .ok_or(AuthError::AccessTokenRequired)?;

    let user = gate.check(&claims).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
