/// Access-token authentication for route handlers
///
/// Handlers that take an `AuthenticatedUser` argument only run once the
/// bearer token in the Authorization header has been verified. Failures are
/// turned into the uniform 401 body by `AppError`.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;
use crate::session::SessionService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let Some(service) = req.app_data::<web::Data<SessionService>>() else {
            return ready(Err(AppError::Internal(
                "session service is not registered".to_string(),
            )));
        };

        let result = service.authenticate(req.headers()).map(|user_id| {
            tracing::debug!(user_id = %user_id, "Access token validated");
            AuthenticatedUser { user_id }
        });
        ready(result)
    }
}
