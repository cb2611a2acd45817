use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
/// Matches the width of the user id columns.
pub const MAX_USER_ID_LEN: usize = 128;

/// The calling user, taken from the `X-User-Id` header set by the
/// authenticating gateway in front of this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        ready(match user {
            None => Err(AppError::Unauthenticated),
            Some(v) if v.chars().count() > MAX_USER_ID_LEN => Err(AppError::BadRequest(format!(
                "{USER_ID_HEADER} exceeds {MAX_USER_ID_LEN} characters"
            ))),
            Some(v) => Ok(Identity(v.to_string())),
        })
    }
}
