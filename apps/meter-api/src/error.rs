//! Error-to-response normalization for the meter API.
//!
//! Every failure origin (schema validation, business rules, storage, the
//! recognition call) arrives here as a `MeasureError` and leaves as the one
//! response contract: `{error_code, error_description}` with the status from
//! the taxonomy table. Storage faults are the only 500-class responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meter_core::MeasureError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub MeasureError);

/// Error response body shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_code: String,
    pub error_description: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            MeasureError::Validation { .. } | MeasureError::InvalidPayload(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_DATA")
            }
            MeasureError::DuplicateReading => (StatusCode::CONFLICT, "DOUBLE_REPORT"),
            MeasureError::RecognitionFailed => (StatusCode::BAD_REQUEST, "INVALID_OCR_DATA"),
            MeasureError::NotFound(_) => (StatusCode::NOT_FOUND, "MEASURE_NOT_FOUND"),
            MeasureError::AlreadyConfirmed(_) => {
                (StatusCode::CONFLICT, "CONFIRMATION_DUPLICATE")
            }
            MeasureError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!("storage fault: {}", self.0);
        }

        let body = ErrorBody {
            error_code: code.to_string(),
            error_description: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_core::PayloadError;

    #[test]
    fn taxonomy_maps_to_contract_codes() {
        let cases = [
            (
                MeasureError::validation("image", "missing"),
                StatusCode::BAD_REQUEST,
                "INVALID_DATA",
            ),
            (
                MeasureError::InvalidPayload(PayloadError::CorruptContent),
                StatusCode::BAD_REQUEST,
                "INVALID_DATA",
            ),
            (
                MeasureError::DuplicateReading,
                StatusCode::CONFLICT,
                "DOUBLE_REPORT",
            ),
            (
                MeasureError::RecognitionFailed,
                StatusCode::BAD_REQUEST,
                "INVALID_OCR_DATA",
            ),
            (
                MeasureError::NotFound("x".into()),
                StatusCode::NOT_FOUND,
                "MEASURE_NOT_FOUND",
            ),
            (
                MeasureError::AlreadyConfirmed("x".into()),
                StatusCode::CONFLICT,
                "CONFIRMATION_DUPLICATE",
            ),
            (
                MeasureError::Storage("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            let api = ApiError(err);
            let (got_status, got_code) = api.status_and_code();
            assert_eq!(got_status, status);
            assert_eq!(got_code, code);
            assert!(!api.0.to_string().is_empty());
        }
    }
}
