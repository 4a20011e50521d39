/// Bearer token extraction from the `Authorization` header.
///
/// Pure parsing: the token's meaning is never inspected here.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the raw token out of `Authorization: Bearer <token>`.
///
/// # Errors
/// `MissingToken` when the header is absent, not ASCII, lacks the exact
/// `Bearer ` prefix, or carries an empty or whitespace-containing token
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MissingToken);
    }

    Ok(token.to_string())
}
