//! Service configuration, read once at startup from flags or environment.

use anyhow::{bail, Context, Result};
use clap::Parser;
use jsonwebtoken::Algorithm;
use std::str::FromStr;

use crate::auth::jwt::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS};

/// Longest token lifetime accepted from configuration (ten years)
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 3600;

/// Work factors bcrypt itself accepts
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Parser, Debug, Clone)]
#[command(name = "bookly")]
#[command(about = "Bookly API - books, reviews and token-based auth")]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Signing algorithm (HS256, HS384 or HS512)
    #[arg(long, env = "JWT_ALGORITHM", default_value = "HS256")]
    pub jwt_algorithm: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_TTL_SECS", default_value_t = DEFAULT_ACCESS_TTL_SECS)]
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TOKEN_TTL_SECS", default_value_t = DEFAULT_REFRESH_TTL_SECS)]
    pub refresh_token_ttl_secs: i64,

    /// bcrypt work factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// SQLite database holding user accounts
    #[arg(long, env = "AUTH_DB_PATH", default_value = "bookly_auth.db")]
    pub auth_db_path: String,

    /// Listen address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,

    /// Seconds between sweeps of expired revocation entries
    #[arg(long, env = "REVOCATION_PURGE_SECS", default_value_t = 60)]
    pub revocation_purge_secs: u64,

    /// Bootstrap admin account, created when no admin exists yet
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl AuthConfig {
    /// Only symmetric HMAC algorithms are usable with a single static secret
    pub fn algorithm(&self) -> Result<Algorithm> {
        let algorithm = Algorithm::from_str(self.jwt_algorithm.trim())
            .with_context(|| format!("Unknown JWT algorithm {}", self.jwt_algorithm))?;

        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => bail!("JWT algorithm {:?} needs a key pair; use HS256, HS384 or HS512", other),
        }
    }

    pub fn access_ttl(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_seconds(self.access_token_ttl_secs)
            .context("Access token lifetime out of range")
    }

    pub fn refresh_ttl(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_seconds(self.refresh_token_ttl_secs)
            .context("Refresh token lifetime out of range")
    }

    /// Reject settings that would produce unusable tokens
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        for (name, secs) in [
            ("ACCESS_TOKEN_TTL_SECS", self.access_token_ttl_secs),
            ("REFRESH_TOKEN_TTL_SECS", self.refresh_token_ttl_secs),
        ] {
            if !(1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
                bail!("{} must be between 1 and {} seconds, got {}", name, MAX_TOKEN_TTL_SECS, secs);
            }
        }
        if !BCRYPT_COST_RANGE.contains(&self.bcrypt_cost) {
            bail!(
                "BCRYPT_COST must be between {} and {}, got {}",
                BCRYPT_COST_RANGE.start(),
                BCRYPT_COST_RANGE.end(),
                self.bcrypt_cost
            );
        }
        self.algorithm()?;
        Ok(())
    }
}
