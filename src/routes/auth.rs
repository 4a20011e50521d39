/// Authentication Routes
///
/// Login, access-token refresh and refresh-token revocation.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::session::SessionService;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub expires_in_seconds: Option<i64>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// POST /api/login
///
/// # Errors
/// - 400: empty fields or non-positive `expires_in_seconds`
/// - 401: unknown email or wrong password, with the same body for both
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let session = sessions
        .login(&form.email, &form.password, form.expires_in_seconds)
        .await?;
    Ok(HttpResponse::Ok().json(session))
}

/// POST /api/refresh
///
/// Expects the refresh token as `Authorization: Bearer <token>`.
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let token = sessions.refresh(req.headers()).await?;
    Ok(HttpResponse::Ok().json(RefreshResponse { token }))
}

/// POST /api/revoke
pub async fn revoke(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    sessions.revoke(req.headers()).await?;
    Ok(HttpResponse::NoContent().finish())
}
