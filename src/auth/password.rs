/// Password Hashing and Verification
///
/// New hashes are Argon2id in PHC string form, so algorithm, parameters and
/// salt all travel inside the stored value. Legacy bcrypt hashes still verify
/// and are flagged for upgrade.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use lazy_static::lazy_static;
use thiserror::Error;

lazy_static! {
    // Stand-in hash verified when no account matches, so both login
    // rejections cost one Argon2 verification
    static ref DUMMY_HASH: Option<HashedCredential> =
        hash_password("dummy-password-for-unknown-accounts").ok();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Algorithm family of a stored hash, read from its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Argon2,
    Bcrypt,
    Unknown,
}

/// A salted one-way password hash, safe to persist as-is
#[derive(Clone, PartialEq, Eq)]
pub struct HashedCredential(String);

impl HashedCredential {
    /// Wrap a hash loaded from storage
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn scheme(&self) -> HashScheme {
        let hash = self.0.as_str();
        if hash.starts_with("$argon2") {
            HashScheme::Argon2
        } else if ["$2a$", "$2b$", "$2x$", "$2y$"]
            .iter()
            .any(|prefix| hash.starts_with(prefix))
        {
            HashScheme::Bcrypt
        } else {
            HashScheme::Unknown
        }
    }
}

impl fmt::Debug for HashedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashedCredential({:?})", self.scheme())
    }
}

/// Hash a password using Argon2id with a fresh random salt
///
/// # Errors
/// Returns `Hashing` if Argon2 rejects the input
pub fn hash_password(password: &str) -> Result<HashedCredential, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| HashedCredential(hash.to_string()))
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against its stored hash
///
/// A wrong password is `Ok(false)`; only an unparseable hash is an error.
/// Comparison is done by the hashing crates in constant time.
pub fn verify_password(password: &str, stored: &HashedCredential) -> Result<bool, PasswordError> {
    match stored.scheme() {
        HashScheme::Argon2 => {
            let parsed = PasswordHash::new(stored.as_str())
                .map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
            match Argon2::default().verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
            }
        }
        HashScheme::Bcrypt => bcrypt::verify(password, stored.as_str())
            .map_err(|e| PasswordError::MalformedHash(e.to_string())),
        HashScheme::Unknown => Err(PasswordError::MalformedHash(
            "unrecognized hash scheme".to_string(),
        )),
    }
}

/// Spend the same work as `verify_password` on an Argon2 hash, discarding the result.
///
/// Used when there is no stored hash to check against.
pub fn verify_dummy_password(password: &str) {
    if let Some(dummy) = DUMMY_HASH.as_ref() {
        let _ = verify_password(password, dummy);
    }
}

/// True when the stored hash should be replaced by a fresh Argon2id hash
pub fn needs_rehash(stored: &HashedCredential) -> bool {
    stored.scheme() != HashScheme::Argon2
}
