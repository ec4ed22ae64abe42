use std::fmt::{Display, Formatter};

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, serde::json::Json};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::RequestId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// The category of an [`Error`], available alongside its message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    Conflict,
    InvalidArgument,
    Unauthorized,
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::InvalidState => "invalid_state",
            Self::Conflict => "conflict",
            Self::InvalidArgument => "invalid_argument",
            Self::Unauthorized => "unauthorized",
            Self::Internal => "internal",
        };
        write!(f, "{name}")
    }
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(why: impl Into<String>) -> Self {
        Self::Forbidden(why.into())
    }

    pub fn invalid_state(why: impl Into<String>) -> Self {
        Self::InvalidState(why.into())
    }

    pub fn conflict(why: impl Into<String>) -> Self {
        Self::Conflict(why.into())
    }

    pub fn invalid_argument(why: impl Into<String>) -> Self {
        Self::InvalidArgument(why.into())
    }

    pub fn unauthorized(why: impl Into<String>) -> Self {
        Self::Unauthorized(why.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    ErrorKind::Unauthorized
                }
                _ => ErrorKind::InvalidArgument,
            },
            Self::Db(_) | Self::Argon2(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> Status {
        match self.kind() {
            ErrorKind::NotFound => Status::NotFound,
            ErrorKind::Forbidden => Status::Forbidden,
            ErrorKind::InvalidState => Status::UnprocessableEntity,
            ErrorKind::Conflict => Status::Conflict,
            ErrorKind::InvalidArgument => Status::BadRequest,
            ErrorKind::Unauthorized => Status::Unauthorized,
            ErrorKind::Internal => Status::InternalServerError,
        }
    }
}

/// The JSON body sent back for any failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let id = RequestId::of(req);
        let body = match self.kind() {
            ErrorKind::Internal => {
                // Don't leak database internals to the client.
                error!("req{id} {self}");
                ErrorBody {
                    kind: ErrorKind::Internal,
                    message: "Internal server error".to_string(),
                }
            }
            kind => {
                warn!("req{id} {self}");
                ErrorBody {
                    kind,
                    message: self.to_string(),
                }
            }
        };
        (status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(Error::not_found("Election 1").status(), Status::NotFound);
        assert_eq!(Error::forbidden("nope").status(), Status::Forbidden);
        assert_eq!(
            Error::invalid_state("closed").status(),
            Status::UnprocessableEntity
        );
        assert_eq!(Error::conflict("again").status(), Status::Conflict);
        assert_eq!(Error::invalid_argument("bad").status(), Status::BadRequest);
        assert_eq!(Error::unauthorized("who").status(), Status::Unauthorized);
    }

    #[test]
    fn message_carries_reason() {
        let err = Error::conflict("You have already voted in this election");
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.to_string(),
            "Conflict: You have already voted in this election"
        );
    }
}
