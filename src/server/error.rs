//! Error-to-HTTP response conversion.
//!
//! Every failure a handler can hit, extractor rejections included, becomes a
//! 400 with `{"success": false, "message": ...}`.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use timelapse_common::Error;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::invalid_input(rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self(Error::invalid_input(rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self(Error::invalid_input(e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(code = self.0.code(), error = %self.0, "Request failed");

        let body = json!({
            "success": false,
            "message": self.0.to_string(),
        });

        (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
    }
}
