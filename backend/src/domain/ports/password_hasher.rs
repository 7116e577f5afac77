//! Port for one-way password hashing.

use super::define_port_error;

define_port_error! {
    /// Failures raised by password hashing adapters.
    pub enum PasswordHashError {
        /// The adapter could not derive a hash.
        Hash { message: String } => "password hashing failed: {message}",
    }
}

/// Derives a storable hash from a plaintext password.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError>;
}

/// Reversible stand-in for tests: prefixes the plaintext with `fixture$`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePasswordHasher;

impl PasswordHasher for FixturePasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError> {
        Ok(format!("fixture${plaintext}"))
    }
}
