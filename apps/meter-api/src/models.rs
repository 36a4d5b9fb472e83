//! Wire types for the meter API.
//!
//! Request fields arrive as `Option`s so that a missing field surfaces as a
//! field-level INVALID_DATA response instead of a bare deserialization
//! failure; the lifecycle service owns the actual validation.

use meter_core::Measure;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub customer_code: Option<String>,
    #[serde(default)]
    pub measure_datetime: Option<String>,
    #[serde(default)]
    pub measure_type: Option<String>,
}

/// Success body of `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub image_url: String,
    pub measure_value: f64,
    pub measure_uuid: Uuid,
}

/// Body of `PATCH /confirm`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub measure_uuid: Option<String>,
    #[serde(default)]
    pub confirmed_value: Option<f64>,
}

/// Success body of `PATCH /confirm`. Acknowledgment only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub success: bool,
}

/// `GET /:customer_code/list` returns the customer's measures as-is.
/// No pagination or filtering; a documented limitation.
pub type MeasureList = Vec<Measure>;
