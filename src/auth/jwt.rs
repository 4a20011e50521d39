/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed JWTs. Verification pins the algorithm
/// before any claim is read, then checks signature, issuer and expiry.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::secret::SigningKey;

/// The only algorithm this codec signs with or accepts
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Fixed `iss` claim
pub const DEFAULT_ISSUER: &str = "chirpy";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    SignatureMismatch,
    #[error("token has expired")]
    Expired,
    #[error("unexpected signing algorithm {0:?}")]
    WrongAlgorithm(Algorithm),
    #[error("unexpected token issuer")]
    WrongIssuer,
    #[error("token subject is not a valid user id")]
    InvalidSubject,
    #[error("{0}")]
    Signing(String),
}

/// Signs and verifies access tokens with one process-wide key
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl fmt::Debug for AccessTokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenCodec")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl AccessTokenCodec {
    pub fn new(key: &SigningKey, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(key.as_bytes()),
            decoding_key: DecodingKey::from_secret(key.as_bytes()),
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a token for `user_id` expiring `ttl` from now.
    ///
    /// # Errors
    /// Returns `Signing` if encoding fails
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String, TokenError> {
        let claims = Claims::new(user_id, &self.issuer, Utc::now(), ttl);

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token and return the user it was issued to.
    ///
    /// # Errors
    /// - `WrongAlgorithm` if the header names anything but HS256
    /// - `SignatureMismatch` if it was signed with another key or tampered with
    /// - `Expired` if `exp` is at or before now
    /// - `WrongIssuer`, `InvalidSubject`, `Malformed` otherwise
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        // Algorithm confusion guard: nothing else in the token is trusted yet
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if header.alg != SIGNING_ALGORITHM {
            tracing::warn!(alg = ?header.alg, "Rejected token with unexpected algorithm");
            return Err(TokenError::WrongAlgorithm(header.alg));
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(classify)?;

        if claims.is_expired_at(Utc::now().timestamp()) {
            return Err(TokenError::Expired);
        }

        claims.user_id()
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    fn key(secret: &str) -> SigningKey {
        SigningKey::new(secret).expect("valid test key")
    }

    fn test_codec() -> AccessTokenCodec {
        AccessTokenCodec::new(&key("test-secret-key-at-least-32-characters-long"), "test")
    }

    fn segments(token: &str) -> Vec<String> {
        token.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_issue_and_verify_token() {
        let codec = test_codec();
        let user_id = Uuid::new_v4();

        let token = codec.issue(user_id, Duration::hours(1)).expect("Failed to issue token");
        let verified = codec.verify(&token).expect("Failed to verify token");

        assert_eq!(verified, user_id);
    }

    #[test]
    fn test_generated_keys_round_trip() {
        let codec = AccessTokenCodec::new(&SigningKey::generate().unwrap(), DEFAULT_ISSUER);
        let user_id = Uuid::new_v4();

        let token = codec.issue(user_id, Duration::minutes(5)).unwrap();
        assert_eq!(codec.verify(&token), Ok(user_id));
    }

    #[test]
    fn test_zero_ttl_is_already_expired() {
        let codec = test_codec();
        let token = codec.issue(Uuid::new_v4(), Duration::zero()).unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_expired_token_fails() {
        let codec = test_codec();
        let issued_at = Utc::now() - Duration::minutes(10);
        let claims = Claims::new(Uuid::new_v4(), "test", issued_at, Duration::minutes(5));

        let token = encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-at-least-32-characters-long"),
        )
        .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_key_is_signature_mismatch() {
        let signer = AccessTokenCodec::new(&SigningKey::generate().unwrap(), "test");
        let verifier = AccessTokenCodec::new(&SigningKey::generate().unwrap(), "test");

        let token = signer.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();

        assert_eq!(verifier.verify(&token), Err(TokenError::SignatureMismatch));
    }

    #[test]
    fn test_tampered_payload_is_signature_mismatch() {
        let codec = test_codec();
        let token = codec.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
        let parts = segments(&token);

        let forged = Claims::new(Uuid::new_v4(), "test", Utc::now(), Duration::hours(1));
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(codec.verify(&tampered), Err(TokenError::SignatureMismatch));
    }

    #[test]
    fn test_other_hmac_algorithm_is_rejected() {
        let codec = test_codec();
        let claims = Claims::new(Uuid::new_v4(), "test", Utc::now(), Duration::hours(1));

        // Same key, different HMAC variant
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-at-least-32-characters-long"),
        )
        .unwrap();

        assert_eq!(
            codec.verify(&token),
            Err(TokenError::WrongAlgorithm(Algorithm::HS512))
        );
    }

    #[test]
    fn test_asymmetric_algorithm_header_is_rejected() {
        let codec = test_codec();
        let token = codec.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
        let parts = segments(&token);

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let confused = format!("{}.{}.{}", header, parts[1], parts[2]);

        assert_eq!(
            codec.verify(&confused),
            Err(TokenError::WrongAlgorithm(Algorithm::RS256))
        );
    }

    #[test]
    fn test_unsigned_token_is_rejected() {
        let codec = test_codec();
        let token = codec.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
        let parts = segments(&token);

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let unsigned = format!("{}.{}.", header, parts[1]);

        assert!(codec.verify(&unsigned).is_err());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = test_codec();

        assert_eq!(codec.verify("invalid.token.here"), Err(TokenError::Malformed));
        assert_eq!(codec.verify(""), Err(TokenError::Malformed));
        assert_eq!(codec.verify("no-dots-at-all"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_wrong_issuer() {
        let secret = "test-secret-key-at-least-32-characters-long";
        let issuer_a = AccessTokenCodec::new(&key(secret), "issuer-a");
        let issuer_b = AccessTokenCodec::new(&key(secret), "issuer-b");

        let token = issuer_a.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();

        assert_eq!(issuer_b.verify(&token), Err(TokenError::WrongIssuer));
    }

    #[test]
    fn test_non_uuid_subject_is_distinct_failure() {
        let codec = test_codec();
        let mut claims = Claims::new(Uuid::new_v4(), "test", Utc::now(), Duration::hours(1));
        claims.sub = "not-a-user".to_string();

        let token = encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-at-least-32-characters-long"),
        )
        .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::InvalidSubject));
    }

    #[test]
    fn test_tokens_for_same_user_differ() {
        let codec = test_codec();
        let user_id = Uuid::new_v4();

        let first = codec.issue(user_id, Duration::hours(1)).unwrap();
        let second = codec.issue(user_id, Duration::hours(1)).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_debug_hides_key_material() {
        let printed = format!("{:?}", test_codec());
        assert!(!printed.contains("test-secret"));
    }
}
