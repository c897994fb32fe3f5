//! Auth error taxonomy and its HTTP translation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("Token is invalid or has been revoked")]
    RevokedToken,

    #[error("Please provide a valid access token")]
    AccessTokenRequired,

    #[error("Please provide a valid refresh token")]
    RefreshTokenRequired,

    #[error("You do not have enough permissions to perform this action")]
    InsufficientPermissions,

    #[error("User not found")]
    UserNotFound,

    #[error("User with email already exists")]
    UserAlreadyExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidToken => "invalid_token",
            AuthError::RevokedToken => "token_revoked",
            AuthError::AccessTokenRequired => "access_token_required",
            AuthError::RefreshTokenRequired => "refresh_token_required",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::UserNotFound => "user_not_found",
            AuthError::UserAlreadyExists => "user_exists",
            AuthError::InvalidCredentials => "invalid_email_or_password",
            AuthError::Validation(_) => "validation_error",
            AuthError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidToken
            | AuthError::RevokedToken
            | AuthError::AccessTokenRequired
            | AuthError::RefreshTokenRequired
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::UserAlreadyExists => StatusCode::CONFLICT,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(e: anyhow::Error) -> Self {
        AuthError::Internal(format!("{e:#}"))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            AuthError::Internal(detail) => {
                error!("Internal auth failure: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "error_code": self.code(),
            "message": message,
        });

        (self.status(), Json(body)).into_response()
    }
}
