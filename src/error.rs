use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status, request::Outcome, response::Responder, serde::json::Json, Request,
};
use thiserror::Error;

use crate::{logging::RequestId, model::api::envelope::Failure};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, message.into())
    }

    /// `what` should describe the missing item, e.g. "Voter ABC1234567".
    pub fn not_found(what: impl AsRef<str>) -> Self {
        Self::Status(Status::NotFound, format!("{} not found", what.as_ref()))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, message.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::Status(status, _) => *status,
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
        }
    }

    /// The message a client may see. Internal detail is logged against the
    /// request instead.
    fn public_message(&self, req: &Request<'_>) -> String {
        let id = req.local_cache(RequestId::next);
        if self.status().code >= 500 {
            error!("req{id} failed: {self}");
            "Internal server error".to_string()
        } else {
            debug!("req{id} rejected: {self}");
            self.to_string()
        }
    }

    /// Fail a request guard with this error.
    ///
    /// Rocket hands guard failures to a catcher rather than to this error's
    /// responder, so the message is stashed for the catcher to report.
    pub fn reject<T>(self, req: &Request<'_>) -> Outcome<T, Self> {
        let message = self.public_message(req);
        req.local_cache(|| Rejection(Some(message)));
        Outcome::Failure((self.status(), self))
    }
}

/// The message of a request guard failure, if any, for the catcher.
pub struct Rejection(pub Option<String>);

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let message = self.public_message(req);
        (status, Json(Failure::new(message))).respond_to(req)
    }
}
