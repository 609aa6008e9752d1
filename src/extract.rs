//! `Json` and `Path` that reject with [`ApiError`], so malformed bodies and ids
//! get the same `{message, statusCode, errors}` body as every other failure.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts,
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, FieldErrors};

const BAD_REQUEST: &str = "Bad request.";

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection, "json body rejected");
        ApiError::Validation {
            message: BAD_REQUEST.into(),
            errors: FieldErrors::from([("body", rejection.body_text())]),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!(error = %rejection, "path rejected");
        ApiError::Validation {
            message: BAD_REQUEST.into(),
            errors: FieldErrors::from([("path", rejection.body_text())]),
        }
    }
}
