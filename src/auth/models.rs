//! Authentication Models
//! Mission: Define user records, token claims and the auth request/response bodies

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account as persisted by the user store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: UserRole,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// User roles for RBAC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserRole {
    #[serde(rename = "admin")]
    Admin, // Full access, including user administration
    #[serde(rename = "user")]
    User, // Books, reviews and own account
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "user" => Some(UserRole::User),
            _ => None,
        }
    }
}

/// Identity claims embedded in every session token.
///
/// The role is a hint for clients only; authorization always re-reads the
/// persisted user record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

impl TokenSubject {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.to_string(),
            email: user.email.clone(),
            role: Some(user.role),
        }
    }
}

/// Access tokens authorize ordinary calls; refresh tokens only mint new access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn is_refresh(self) -> bool {
        matches!(self, TokenKind::Refresh)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user: TokenSubject,
    pub exp: i64, // expiration, unix seconds
    pub iat: i64, // issued at, unix seconds
    pub jti: String, // unique token id, used as the revocation key
    pub refresh: bool,
}

impl Claims {
    pub fn kind(&self) -> TokenKind {
        if self.refresh {
            TokenKind::Refresh
        } else {
            TokenKind::Access
        }
    }

    /// A token is stale at or after its expiry instant.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }
}

/// Fields needed to insert a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Partial update applied by the user store; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password_hash: Option<String>,
    pub is_verified: Option<bool>,
    pub role: Option<UserRole>,
}

/// Signup request body
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub user: TokenSubject,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// User response (sanitized)
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_verified: bool,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            is_verified: user.is_verified,
            created_at: user.created_at.clone(),
        }
    }
}
