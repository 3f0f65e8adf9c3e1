use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use crate::error::AppError;

/// The authenticated caller. Every job read and write is scoped to `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    owner: String,
}

impl Identity {
    pub fn new(owner: impl Into<String>) -> Self {
        Self { owner: owner.into() }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

/// Resolved by `AuthMiddleware`; a request without one is rejected here.
impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<Identity>().cloned().ok_or(AppError::Unauthorized))
    }
}
