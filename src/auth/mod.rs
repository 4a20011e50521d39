/// Authentication module
///
/// Credential hashing, access-token signing/verification, bearer header
/// parsing and refresh-token records.

mod bearer;
mod claims;
mod jwt;
mod password;
mod refresh_token;
mod secret;

pub use bearer::extract_bearer_token;
pub use claims::Claims;
pub use jwt::{AccessTokenCodec, TokenError, DEFAULT_ISSUER, SIGNING_ALGORITHM};
pub use password::{
    hash_password, needs_rehash, verify_dummy_password, verify_password, HashScheme,
    HashedCredential, PasswordError,
};
pub use refresh_token::{hash_token, RefreshToken, RefreshTokenState};
pub use secret::{generate_opaque_secret, SigningKey, MIN_SIGNING_KEY_BYTES, OPAQUE_SECRET_BYTES};
