use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::{ErrorBody, ErrorKind};

pub mod auth;
pub mod elections;
pub mod organization;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(elections::routes());
    routes.extend(organization::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Give guard failures and unmatched routes the same JSON shape as [`crate::error::Error`].
#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Json<ErrorBody>) {
    let kind = match status.code {
        // Errors returned by handlers never reach a catcher, so these come
        // from malformed bodies and parameters.
        400 | 422 => ErrorKind::InvalidArgument,
        401 => ErrorKind::Unauthorized,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::Conflict,
        _ => ErrorKind::Internal,
    };
    let message = status.reason().unwrap_or("Unknown error").to_string();
    (status, Json(ErrorBody { kind, message }))
}
