//! Request extractors that reject with the API error envelope.
//!
//! axum's own `Json`, `Path` and `Query` reject with plain-text bodies. The
//! wrappers here run the same extraction and turn the rejection into an
//! [`ApiError`], so every 4xx response carries `{"error": {...}}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::server::api_error::{ApiError, ErrorCode};

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON with a missing field or a value of the wrong shape.
            JsonRejection::JsonDataError(e) => {
                ApiError::with_message(ErrorCode::InvalidField, e.body_text())
            }
            other => ApiError::with_message(ErrorCode::InvalidRequest, other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::with_message(ErrorCode::InvalidField, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::with_message(ErrorCode::InvalidField, rejection.body_text())
    }
}
