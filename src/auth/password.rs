//! Password hashing with bcrypt (salted, tunable work factor).

use crate::errors::AuthError;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| AuthError::Internal(format!("failed to hash password: {e}")))
    }

    /// Constant-time check of `plaintext` against a stored digest.
    /// A digest that cannot be parsed never verifies.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match bcrypt::verify(plaintext, digest) {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Unreadable password digest: {}", e);
                false
            }
        }
    }
}
