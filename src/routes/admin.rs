use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::session::SessionService;

/// POST /admin/reset
///
/// Deletes every user and refresh token. 403 outside the dev platform.
pub async fn reset(sessions: web::Data<SessionService>) -> Result<HttpResponse, AppError> {
    sessions.reset().await?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Reset complete"))
}
