//! Bookly API server
//!
//! Loads configuration, opens the user store, wires the auth core and serves HTTP.

use anyhow::{Context, Result};
use bookly_backend::{
    auth::{
        models::{NewUser, UserRole},
        AuthState, MemoryCache, PasswordHasher, RevocationStore, TokenCodec, UserStore,
    },
    config::AuthConfig,
    routes::app_router,
};
use clap::Parser;
use dotenv::dotenv;
use std::{path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = AuthConfig::parse();
    config.validate()?;

    info!("Bookly API starting");

    let passwords = PasswordHasher::new(config.bcrypt_cost);
    let user_store = Arc::new(UserStore::new(&config.auth_db_path)?);
    bootstrap_admin(&config, &user_store, &passwords)?;
    info!("User store initialized at: {}", config.auth_db_path);

    let codec = Arc::new(
        TokenCodec::new(&config.jwt_secret, config.algorithm()?)
            .with_ttls(config.access_ttl()?, config.refresh_ttl()?),
    );

    let cache = Arc::new(MemoryCache::new());
    tokio::spawn(revocation_purge_loop(
        cache.clone(),
        Duration::from_secs(config.revocation_purge_secs.max(1)),
    ));

    let state = AuthState::new(
        user_store,
        codec,
        RevocationStore::new(cache),
        passwords,
    );

    let app = app_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with an env-driven filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookly_backend=debug,bookly=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate root .env when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

/// Create the configured admin account when the store has no admin yet
fn bootstrap_admin(
    config: &AuthConfig,
    store: &UserStore,
    passwords: &PasswordHasher,
) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if store.count_admins()? > 0 {
        debug!("Admin account already present, skipping bootstrap");
        return Ok(());
    }

    if store.get_user_by_email(email)?.is_some() {
        warn!("ADMIN_EMAIL {} belongs to an existing non-admin account", email);
        return Ok(());
    }

    let password_hash = passwords.hash(password)?;
    store.create_user(NewUser {
        username: "admin".to_string(),
        email: email.clone(),
        first_name: "Admin".to_string(),
        last_name: "Admin".to_string(),
        password_hash,
        role: UserRole::Admin,
    })?;

    info!("Bootstrap admin created: {}", email);
    Ok(())
}

/// Periodically drop expired revocation entries
async fn revocation_purge_loop(cache: Arc<MemoryCache>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let purged = cache.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired revocation entries", purged);
        }
    }
}
