use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Per-field messages reported under `errors` in the response body.
pub type FieldErrors = BTreeMap<&'static str, String>;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },

    #[error("{message}")]
    Conflict { message: String, errors: FieldErrors },

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn spot_not_found() -> Self {
        ApiError::NotFound("Spot couldn't be found")
    }

    pub fn validation(errors: FieldErrors) -> Self {
        ApiError::Validation {
            message: "Validation error".into(),
            errors,
        }
    }

    pub fn invalid_field(field: &'static str, msg: impl Into<String>) -> Self {
        Self::validation(FieldErrors::from([(field, msg.into())]))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict { .. } | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: String,
    status_code: u16,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: FieldErrors,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            ApiError::Validation { message, errors } | ApiError::Conflict { message, errors } => {
                (message, errors)
            }
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                ("Internal server error".to_string(), FieldErrors::new())
            }
            other => (other.to_string(), FieldErrors::new()),
        };

        let body = Json(ErrorBody {
            message,
            status_code: status.as_u16(),
            errors,
        });
        (status, body).into_response()
    }
}

/// SQLSTATE of a database error, if the driver reported one.
pub(crate) fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

pub(crate) const UNIQUE_VIOLATION: &str = "23505";
pub(crate) const EXCLUSION_VIOLATION: &str = "23P01";
