//! User Storage
//! Mission: Persist user accounts in SQLite behind a repository seam

use crate::auth::models::{NewUser, User, UserRole, UserUpdate};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{ffi, params, types::Type, Connection, Row};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Insert hit the unique index on `email`
#[derive(Debug, Error)]
#[error("user with email {0} already exists")]
pub struct DuplicateEmail(pub String);

/// Record store the auth core reads users from
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: &Uuid) -> Result<Option<User>>;

    /// Fails with [`DuplicateEmail`] when the address is already taken
    async fn insert_user(&self, new_user: NewUser) -> Result<User>;

    async fn update_user(&self, user: &User, update: UserUpdate) -> Result<User>;

    async fn all_users(&self) -> Result<Vec<User>>;
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, role, \
                            is_verified, created_at, updated_at";

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open user database at {}", self.db_path))
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                is_verified INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create users table")?;

        Ok(())
    }

    fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
        let id: String = row.get(0)?;
        let id = Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
        let role: String = row.get(6)?;

        Ok(User {
            id,
            username: row.get(1)?,
            email: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            password_hash: row.get(5)?,
            // Unknown roles degrade to the least privileged one
            role: UserRole::from_str(&role).unwrap_or(UserRole::User),
            is_verified: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn query_one(&self, filter: &str, value: &str) -> Result<Option<User>> {
        let conn = self.connect()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = ?1");
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![value], Self::row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get user by email
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_one("email", email)
    }

    /// Get user by primary key
    pub fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        self.query_one("id", &id.to_string())
    }

    /// Create a new user
    pub fn create_user(&self, new_user: NewUser) -> Result<User> {
        let now = Utc::now().to_rfc3339();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            is_verified: false,
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT INTO users (id, username, email, first_name, last_name, password_hash,
                                role, is_verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.first_name,
                user.last_name,
                user.password_hash,
                user.role.as_str(),
                user.is_verified,
                user.created_at,
                user.updated_at,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Err(DuplicateEmail(user.email).into());
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to insert user")),
        }

        info!("Created user: {} ({})", user.email, user.role.as_str());

        Ok(user)
    }

    /// Apply a partial update and return the stored result
    pub fn patch_user(&self, user: &User, update: UserUpdate) -> Result<User> {
        let mut updated = user.clone();
        if let Some(hash) = update.password_hash {
            updated.password_hash = hash;
        }
        if let Some(verified) = update.is_verified {
            updated.is_verified = verified;
        }
        if let Some(role) = update.role {
            updated.role = role;
        }
        updated.updated_at = Utc::now().to_rfc3339();

        let conn = self.connect()?;
        let rows_affected = conn
            .execute(
                "UPDATE users SET password_hash = ?1, role = ?2, is_verified = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    updated.password_hash,
                    updated.role.as_str(),
                    updated.is_verified,
                    updated.updated_at,
                    updated.id.to_string(),
                ],
            )
            .context("Failed to update user")?;

        if rows_affected == 0 {
            anyhow::bail!("User not found");
        }

        Ok(updated)
    }

    /// List all users (admin only)
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.connect()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
        let mut stmt = conn.prepare(&sql)?;

        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    pub fn count_admins(&self) -> Result<i64> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check for admin users")
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_by_email(email)
    }

    async fn find_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        self.get_user_by_id(id)
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User> {
        self.create_user(new_user)
    }

    async fn update_user(&self, user: &User, update: UserUpdate) -> Result<User> {
        self.patch_user(user, update)
    }

    async fn all_users(&self) -> Result<Vec<User>> {
        self.list_users()
    }
}
