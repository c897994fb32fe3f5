//! Authentication API Endpoints
//! Mission: Signup, login, token refresh, logout and account lookup

use crate::auth::{
    jwt::TokenCodec,
    models::{
        Claims, LoginRequest, LoginResponse, NewUser, RefreshResponse, SignupRequest, TokenKind,
        TokenSubject, User, UserResponse, UserRole,
    },
    password::PasswordHasher,
    revocation::RevocationStore,
    user_store::{DuplicateEmail, UserRepository},
};
use crate::errors::AuthError;
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<dyn UserRepository>,
    pub codec: Arc<TokenCodec>,
    pub revocations: RevocationStore,
    pub passwords: PasswordHasher,
}

impl AuthState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        codec: Arc<TokenCodec>,
        revocations: RevocationStore,
        passwords: PasswordHasher,
    ) -> Self {
        Self {
            users,
            codec,
            revocations,
            passwords,
        }
    }
}

fn validate_signup(payload: &SignupRequest) -> Result<(), AuthError> {
    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 10 {
        return Err(AuthError::Validation(
            "username must be 1 to 10 characters".into(),
        ));
    }
    if payload.email.chars().count() > 40 || !payload.email.contains('@') {
        return Err(AuthError::Validation(
            "email must be a valid address of at most 40 characters".into(),
        ));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(AuthError::Validation("first and last name are required".into()));
    }
    if payload.password.chars().count() < 6 {
        return Err(AuthError::Validation(
            "password must be at least 6 characters".into(),
        ));
    }
    Ok(())
}

/// Signup endpoint - POST /api/v1/auth/signup
pub async fn signup(
    State(state): State<AuthState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    validate_signup(&payload)?;

    // Fast path only; the unique index decides concurrent signups
    if state
        .users
        .find_user_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(AuthError::UserAlreadyExists);
    }

    let password_hash = state.passwords.hash(&payload.password)?;
    let user = state
        .users
        .insert_user(NewUser {
            username: payload.username.trim().to_string(),
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password_hash,
            role: UserRole::User,
        })
        .await
        .map_err(|e| {
            if e.is::<DuplicateEmail>() {
                AuthError::UserAlreadyExists
            } else {
                AuthError::from(e)
            }
        })?;

    info!("Account created: {}", user.email);

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Login endpoint - POST /api/v1/auth/login
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    info!("Login attempt: {}", payload.email);

    let user = state.users.find_user_by_email(&payload.email).await?;

    // Unknown email and wrong password are indistinguishable to the caller
    let Some(user) = user.filter(|u| state.passwords.verify(&payload.password, &u.password_hash))
    else {
        warn!("Failed login attempt: {}", payload.email);
        return Err(AuthError::InvalidCredentials);
    };

    let subject = TokenSubject::from_user(&user);
    let access_token = state.codec.issue(&subject, TokenKind::Access, None)?;
    let refresh_token = state.codec.issue(&subject, TokenKind::Refresh, None)?;

    info!("Login successful: {} ({})", user.email, user.role.as_str());

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        access_token,
        refresh_token,
        user: subject,
    }))
}

/// Refresh endpoint - GET /api/v1/auth/refresh_token (refresh guard)
pub async fn refresh_token(
    State(state): State<AuthState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<RefreshResponse>, AuthError> {
    let access_token = state.codec.issue(&claims.user, TokenKind::Access, None)?;
    Ok(Json(RefreshResponse { access_token }))
}

/// Logout endpoint - GET /api/v1/auth/logout (access guard)
pub async fn logout(
    State(state): State<AuthState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, AuthError> {
    state.revocations.revoke(&claims.jti, claims.exp).await?;

    info!("Logged out: {}", claims.user.email);

    Ok(Json(json!({ "message": "Logged Out Successfully" })))
}

/// Current user - GET /api/v1/auth/me (access guard + role gate)
pub async fn get_current_user(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from_user(&user))
}

/// List all users - GET /api/v1/admin/users (access guard + admin role gate)
pub async fn list_users(State(state): State<AuthState>) -> Result<Json<Vec<UserResponse>>, AuthError> {
    let users = state.users.all_users().await?;
    Ok(Json(users.iter().map(UserResponse::from_user).collect()))
}
