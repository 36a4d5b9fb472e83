//! HTTP handlers for the meter API.
//!
//! Handlers stay thin: they surface body rejections as INVALID_DATA and
//! delegate everything else to the lifecycle service.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Value};

use meter_core::MeasureError;

use crate::error::ApiError;
use crate::models::{ConfirmRequest, ConfirmResponse, MeasureList, UploadRequest, UploadResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "meter-api",
    }))
}

/// `POST /upload` — submit a new reading image.
pub async fn upload_measure(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Json(request) = body.map_err(reject)?;
    let response = state.service.create(request).await?;
    Ok(Json(response))
}

/// `PATCH /confirm` — one-shot confirmation of an extracted value.
pub async fn confirm_measure(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let Json(request) = body.map_err(reject)?;
    let response = state.service.confirm(request).await?;
    Ok(Json(response))
}

/// `GET /:customer_code/list` — every reading for a customer.
pub async fn list_measures(
    State(state): State<Arc<AppState>>,
    Path(customer_code): Path<String>,
) -> Result<Json<MeasureList>, ApiError> {
    let measures = state.service.list(&customer_code).await?;
    Ok(Json(measures))
}

fn reject(rejection: JsonRejection) -> ApiError {
    ApiError(MeasureError::validation("body", rejection.body_text()))
}
