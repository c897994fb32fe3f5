//! Bookly Backend Library
//!
//! Token-based authentication core for the Bookly API, shared by the
//! `bookly` binary and the integration tests.

pub mod auth;
pub mod config;
pub mod errors;
pub mod routes;

pub use config::AuthConfig;
pub use errors::AuthError;
