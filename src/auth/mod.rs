//! Authentication Module
//! Mission: Signed session tokens, revocation, role checks and password hashing

pub mod api;
pub mod guard;
pub mod jwt;
pub mod models;
pub mod password;
pub mod resolver;
pub mod revocation;
pub mod roles;
pub mod user_store;

pub use api::AuthState;
pub use guard::{token_guard_middleware, TokenGuard};
pub use jwt::TokenCodec;
pub use password::PasswordHasher;
pub use resolver::IdentityResolver;
pub use revocation::{CacheBackend, MemoryCache, RevocationStore};
pub use roles::{role_gate_middleware, RoleGate};
pub use user_store::{DuplicateEmail, UserRepository, UserStore};
