mod admin;
mod auth;
mod health_check;
mod users;

pub use admin::reset;
pub use auth::{login, refresh, revoke, LoginRequest, RefreshResponse};
pub use health_check::health_check;
pub use users::{create_user, delete_user, update_user, CredentialsRequest};

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::error::{AppError, ValidationError};

/// Malformed or incomplete JSON bodies get the same 400 shape as other input errors
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "Rejected request body");
    AppError::Validation(ValidationError::InvalidFormat("request body")).into()
}

/// Register every route on the application
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(
            web::scope("/api")
                .route("/healthz", web::get().to(health_check))
                .route("/users", web::post().to(create_user))
                .route("/users", web::put().to(update_user))
                .route("/users/{user_id}", web::delete().to(delete_user))
                .route("/login", web::post().to(login))
                .route("/refresh", web::post().to(refresh))
                .route("/revoke", web::post().to(revoke)),
        )
        .service(web::scope("/admin").route("/reset", web::post().to(reset)));
}
