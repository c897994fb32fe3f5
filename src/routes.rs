//! Router composition: wires the guards and role gates around the auth handlers.

use crate::auth::{
    api::{self as auth_api, AuthState},
    guard::{token_guard_middleware, TokenGuard},
    models::UserRole,
    resolver::IdentityResolver,
    roles::{role_gate_middleware, RoleGate},
};
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn app_router(state: AuthState) -> Router {
    let access_guard = TokenGuard::access(state.codec.clone(), state.revocations.clone());
    let refresh_guard = TokenGuard::refresh(state.codec.clone(), state.revocations.clone());

    let resolver = IdentityResolver::new(state.users.clone());
    let any_role = RoleGate::new(resolver.clone(), [UserRole::Admin, UserRole::User]);
    let admin_only = RoleGate::new(resolver, [UserRole::Admin]);

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/auth/signup", post(auth_api::signup))
        .route("/api/v1/auth/login", post(auth_api::login));

    // Only a refresh token opens this one
    let refresh_routes = Router::new()
        .route("/api/v1/auth/refresh_token", get(auth_api::refresh_token))
        .route_layer(middleware::from_fn_with_state(
            refresh_guard,
            token_guard_middleware,
        ));

    let member_routes: Router<AuthState> = Router::new()
        .route("/api/v1/auth/me", get(auth_api::get_current_user))
        .route_layer(middleware::from_fn_with_state(any_role, role_gate_middleware));

    let admin_routes = Router::new()
        .route("/api/v1/admin/users", get(auth_api::list_users))
        .route_layer(middleware::from_fn_with_state(
            admin_only,
            role_gate_middleware,
        ));

    // Access guard runs first, then any role gate beneath it
    let protected_routes = Router::new()
        .route("/api/v1/auth/logout", get(auth_api::logout))
        .merge(member_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            access_guard,
            token_guard_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(refresh_routes)
        .merge(protected_routes)
        .with_state(state)
}
