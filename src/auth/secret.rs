/// Signing Key and Opaque Secrets
///
/// The signing key is loaded once from configuration and shared read-only
/// across requests. Opaque secrets come straight from the OS CSPRNG and are
/// used for refresh-token values and for minting new signing keys.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::ConfigError;

/// Bytes of randomness behind every opaque secret
pub const OPAQUE_SECRET_BYTES: usize = 32;

/// Shortest signing secret accepted at startup
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Generate a URL-safe, unpadded base64 string over 32 random bytes.
///
/// # Errors
/// Returns error if the operating system RNG is unavailable
pub fn generate_opaque_secret() -> Result<String, rand::Error> {
    let mut bytes = [0u8; OPAQUE_SECRET_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Symmetric key used to sign and verify access tokens.
///
/// `Debug` never prints the key material.
#[derive(Clone)]
pub struct SigningKey(Arc<str>);

impl SigningKey {
    /// Wrap a configured secret, rejecting blank or short values.
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.secret"));
        }
        if secret.len() < MIN_SIGNING_KEY_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "auth.secret must be at least {} bytes",
                MIN_SIGNING_KEY_BYTES
            )));
        }
        Ok(Self(Arc::from(secret)))
    }

    /// Fresh random key, mainly for tests and key rotation tooling
    pub fn generate() -> Result<Self, rand::Error> {
        let secret = generate_opaque_secret()?;
        Ok(Self(Arc::from(secret.as_str())))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}
