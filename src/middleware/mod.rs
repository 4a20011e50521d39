/// Middleware module
///
/// Request extractors and wrappers shared by the route handlers.

mod authenticated_user;

pub use authenticated_user::AuthenticatedUser;
