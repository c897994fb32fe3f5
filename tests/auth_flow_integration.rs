//! Integration tests for the composed auth router
//!
//! Drives signup, login, guarded endpoints, refresh and logout through the
//! real router with an on-disk SQLite store and the in-memory revocation cache.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookly_backend::auth::{
    models::{NewUser, User, UserRole, UserUpdate},
    AuthState, MemoryCache, PasswordHasher, RevocationStore, TokenCodec, UserRepository,
    UserStore,
};
use bookly_backend::routes::app_router;
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    store: Arc<UserStore>,
    _db: NamedTempFile,
}

fn test_app() -> TestApp {
    test_app_with(|store| store as Arc<dyn UserRepository>)
}

/// Build the app over a repository derived from the backing store
fn test_app_with(
    wrap: impl FnOnce(Arc<UserStore>) -> Arc<dyn UserRepository>,
) -> TestApp {
    let db = NamedTempFile::new().unwrap();
    let store = Arc::new(UserStore::new(db.path().to_str().unwrap()).unwrap());
    let state = AuthState::new(
        wrap(store.clone()),
        Arc::new(TokenCodec::new("integration-secret", Algorithm::HS256)),
        RevocationStore::new(Arc::new(MemoryCache::new())),
        PasswordHasher::new(4),
    );

    TestApp {
        router: app_router(state),
        store,
        _db: db,
    }
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn signup_and_login(app: &TestApp, email: &str) -> (String, String) {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({
            "username": "reader",
            "email": email,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "password": "correct-pw",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": "correct-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_signup_rejects_duplicate_email() {
    let app = test_app();
    signup_and_login(&app, "a@x.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({
            "username": "other",
            "email": "a@x.com",
            "first_name": "Grace",
            "last_name": "Hopper",
            "password": "another-pw",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "user_exists");
}

/// Email lookups always miss, as when two signups race past the pre-check
struct StaleLookups(Arc<UserStore>);

#[async_trait]
impl UserRepository for StaleLookups {
    async fn find_user_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
        Ok(None)
    }

    async fn find_user_by_id(&self, id: &Uuid) -> anyhow::Result<Option<User>> {
        self.0.find_user_by_id(id).await
    }

    async fn insert_user(&self, new_user: NewUser) -> anyhow::Result<User> {
        self.0.insert_user(new_user).await
    }

    async fn update_user(&self, user: &User, update: UserUpdate) -> anyhow::Result<User> {
        self.0.update_user(user, update).await
    }

    async fn all_users(&self) -> anyhow::Result<Vec<User>> {
        self.0.all_users().await
    }
}

#[tokio::test]
async fn test_signup_conflict_decided_by_store() {
    let app = test_app_with(|store| Arc::new(StaleLookups(store)) as Arc<dyn UserRepository>);
    let signup = json!({
        "username": "reader",
        "email": "a@x.com",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "password": "correct-pw",
    });

    let (status, _) = send(&app, Method::POST, "/api/v1/auth/signup", None, Some(signup.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, "/api/v1/auth/signup", None, Some(signup)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "user_exists");

    assert_eq!(app.store.list_users().unwrap().len(), 1);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = test_app();
    signup_and_login(&app, "a@x.com").await;

    for (email, password) in [("a@x.com", "wrong-pw"), ("nobody@x.com", "correct-pw")] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "invalid_email_or_password");
    }
}

#[tokio::test]
async fn test_me_requires_access_token() {
    let app = test_app();
    let (access, refresh) = signup_and_login(&app, "a@x.com").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "access_token_required");

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "invalid_token");

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "access_token_required");

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["role"], "user");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_refresh_endpoint_without_token_is_unauthorized() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/refresh_token", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "refresh_token_required");
}

#[tokio::test]
async fn test_refresh_endpoint_requires_refresh_token() {
    let app = test_app();
    let (access, refresh) = signup_and_login(&app, "a@x.com").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/auth/refresh_token",
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "refresh_token_required");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/auth/refresh_token",
        Some(&refresh),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let fresh = body["access_token"].as_str().unwrap();
    let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", Some(fresh), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = test_app();
    let (access, refresh) = signup_and_login(&app, "a@x.com").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged Out Successfully");

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "token_revoked");

    // Logging out twice is rejected at the guard, not an error in the store
    let (status, body) = send(&app, Method::GET, "/api/v1/auth/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "token_revoked");

    // The refresh token has its own id and is unaffected
    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/auth/refresh_token",
        Some(&refresh),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_route_follows_stored_role() {
    let app = test_app();
    let (access, _) = signup_and_login(&app, "a@x.com").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/admin/users", Some(&access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "insufficient_permissions");

    // Promote in the store; the same token is admitted without re-login
    let user = app.store.get_user_by_email("a@x.com").unwrap().unwrap();
    app.store
        .patch_user(
            &user,
            UserUpdate {
                role: Some(UserRole::Admin),
                ..Default::default()
            },
        )
        .unwrap();

    let (status, body) = send(&app, Method::GET, "/api/v1/admin/users", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}
