/// User Account Routes

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::session::SessionService;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/users
///
/// # Errors
/// - 400: empty or malformed email, empty password
/// - 409: email already registered
pub async fn create_user(
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let user = sessions.register(&form.email, &form.password).await?;
    Ok(HttpResponse::Created().json(user))
}

/// PUT /api/users
///
/// Replaces the caller's own email and password.
pub async fn update_user(
    user: AuthenticatedUser,
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let profile = sessions
        .update_credentials(user.user_id, &form.email, &form.password)
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// DELETE /api/users/{user_id}
///
/// # Errors
/// - 401: missing or invalid access token
/// - 404: no such user
/// - 403: the account belongs to someone else
pub async fn delete_user(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    sessions.delete_user(user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
