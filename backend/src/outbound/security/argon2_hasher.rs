//! Argon2id implementation of the [`PasswordHasher`] port.

use argon2::Argon2;
use argon2::password_hash::{PasswordHasher as _, SaltString};
use rand::rngs::OsRng;

use crate::domain::ports::{PasswordHashError, PasswordHasher};

/// Hashes passwords with Argon2id and a fresh random salt, producing PHC
/// strings such as `$argon2id$v=19$m=19456,t=2,p=1$...`.
#[derive(Debug, Default, Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| PasswordHashError::hash(err.to_string()))
    }
}
