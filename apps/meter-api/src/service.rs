//! The measure lifecycle state machine.
//!
//! A measure is Unconfirmed from creation until a single successful
//! confirmation makes it Confirmed; there is no other state and no reverse
//! transition. Creation is ordered cheap-rejects-first: validation and
//! payload decoding are side-effect-free, the duplicate pre-check and the
//! recognition call both precede any durable write, so predictable failures
//! leave no orphaned files or half-written records.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use meter_core::{BillingPeriod, FieldIssue, ImagePayload, MeasureError, MeasureType};
use tracing::info;
use uuid::Uuid;

use crate::imaging::ImageStore;
use crate::models::{ConfirmRequest, ConfirmResponse, MeasureList, UploadRequest, UploadResponse};
use crate::recognition::ReadingRecognizer;
use crate::repository::{MeasureRepository, NewMeasure};

pub struct MeasureService {
    repo: MeasureRepository,
    recognizer: Arc<dyn ReadingRecognizer>,
    images: ImageStore,
}

/// Validated form of an upload request.
#[derive(Debug)]
struct UploadInput {
    image: String,
    customer_code: String,
    measure_datetime: DateTime<Utc>,
    measure_type: MeasureType,
}

impl MeasureService {
    pub fn new(
        repo: MeasureRepository,
        recognizer: Arc<dyn ReadingRecognizer>,
        images: ImageStore,
    ) -> Self {
        MeasureService {
            repo,
            recognizer,
            images,
        }
    }

    /// Create operation: validate → decode → duplicate pre-check →
    /// recognize → store image → insert.
    pub async fn create(&self, request: UploadRequest) -> Result<UploadResponse, MeasureError> {
        let input = validate_upload(request)?;

        let payload = ImagePayload::parse(&input.image)?;

        let period = BillingPeriod::containing(input.measure_datetime);
        if self
            .repo
            .exists_in_period(&input.customer_code, input.measure_type, &period)
            .await?
        {
            return Err(MeasureError::DuplicateReading);
        }

        // Recognition gates all durable side effects: on "no reading" there
        // is no stored image and no record.
        let measure_value = self
            .recognizer
            .extract_reading(&payload)
            .await
            .ok_or(MeasureError::RecognitionFailed)?;

        let image_url = self.images.store(&payload, &input.customer_code).await?;

        let measure = self
            .repo
            .create(NewMeasure {
                customer_code: input.customer_code,
                measure_type: input.measure_type,
                measure_datetime: input.measure_datetime,
                billing_month: period.month_key(),
                measure_value,
                image_url,
            })
            .await?;

        info!(
            measure_uuid = %measure.measure_uuid,
            customer_code = %measure.customer_code,
            measure_type = %measure.measure_type,
            "created measure"
        );

        Ok(UploadResponse {
            image_url: measure.image_url,
            measure_value: measure.measure_value,
            measure_uuid: measure.measure_uuid,
        })
    }

    /// Confirm operation: one-shot transition Unconfirmed → Confirmed with
    /// the caller's corrected value.
    pub async fn confirm(&self, request: ConfirmRequest) -> Result<ConfirmResponse, MeasureError> {
        let raw_uuid = request
            .measure_uuid
            .ok_or_else(|| MeasureError::validation("measure_uuid", "field is required"))?;
        let confirmed_value = request
            .confirmed_value
            .ok_or_else(|| MeasureError::validation("confirmed_value", "field is required"))?;

        let id = Uuid::parse_str(&raw_uuid)
            .map_err(|_| MeasureError::validation("measure_uuid", "must be a valid UUID"))?;

        let measure = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| MeasureError::NotFound(raw_uuid.clone()))?;

        if measure.confirmed {
            return Err(MeasureError::AlreadyConfirmed(raw_uuid));
        }

        // The read above can go stale under concurrent confirmers; the
        // conditional update is what actually decides.
        if !self.repo.confirm(id, confirmed_value).await? {
            return Err(MeasureError::AlreadyConfirmed(raw_uuid));
        }

        info!(measure_uuid = %id, "confirmed measure");

        Ok(ConfirmResponse { success: true })
    }

    /// List operation: everything for the customer, unfiltered.
    pub async fn list(&self, customer_code: &str) -> Result<MeasureList, MeasureError> {
        self.repo.find_by_customer(customer_code).await
    }
}

fn validate_upload(request: UploadRequest) -> Result<UploadInput, MeasureError> {
    let mut issues = Vec::new();

    if request.image.as_deref().unwrap_or("").is_empty() {
        issues.push(FieldIssue::new("image", "field is required"));
    }
    if request.customer_code.as_deref().unwrap_or("").is_empty() {
        issues.push(FieldIssue::new("customer_code", "field is required"));
    }

    let measure_datetime = match request.measure_datetime.as_deref() {
        None | Some("") => {
            issues.push(FieldIssue::new("measure_datetime", "field is required"));
            None
        }
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(_) => {
                issues.push(FieldIssue::new(
                    "measure_datetime",
                    "must be an ISO-8601 timestamp",
                ));
                None
            }
        },
    };

    let measure_type = match request.measure_type.as_deref() {
        None | Some("") => {
            issues.push(FieldIssue::new("measure_type", "field is required"));
            None
        }
        Some(raw) => match MeasureType::from_str(raw) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                issues.push(FieldIssue::new("measure_type", "must be WATER or GAS"));
                None
            }
        },
    };

    match (
        request.image,
        request.customer_code,
        measure_datetime,
        measure_type,
    ) {
        (Some(image), Some(customer_code), Some(measure_datetime), Some(measure_type))
            if issues.is_empty() =>
        {
            Ok(UploadInput {
                image,
                customer_code,
                measure_datetime,
                measure_type,
            })
        }
        _ => Err(MeasureError::from_issues(issues)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> UploadRequest {
        UploadRequest {
            image: Some("data:image/png;base64,".to_string()),
            customer_code: Some("customer-1".to_string()),
            measure_datetime: Some("2024-05-10T10:00:00Z".to_string()),
            measure_type: Some("WATER".to_string()),
        }
    }

    #[test]
    fn complete_request_validates() {
        let input = validate_upload(full_request()).unwrap();
        assert_eq!(input.customer_code, "customer-1");
        assert_eq!(input.measure_type, MeasureType::Water);
    }

    #[test]
    fn first_missing_field_wins() {
        let request = UploadRequest {
            image: None,
            measure_type: Some("FIRE".to_string()),
            ..full_request()
        };
        let err = validate_upload(request).unwrap_err();
        assert_eq!(err, MeasureError::validation("image", "field is required"));
    }

    #[test]
    fn bad_datetime_is_field_level() {
        let request = UploadRequest {
            measure_datetime: Some("10/05/2024".to_string()),
            ..full_request()
        };
        let err = validate_upload(request).unwrap_err();
        assert_eq!(err.field_path(), Some("measure_datetime"));
    }

    #[test]
    fn bad_type_is_field_level() {
        let request = UploadRequest {
            measure_type: Some("ELECTRIC".to_string()),
            ..full_request()
        };
        let err = validate_upload(request).unwrap_err();
        assert_eq!(err.field_path(), Some("measure_type"));
    }

    #[test]
    fn offset_datetimes_normalize_to_utc() {
        let request = UploadRequest {
            measure_datetime: Some("2024-05-10T10:00:00-03:00".to_string()),
            ..full_request()
        };
        let input = validate_upload(request).unwrap();
        assert_eq!(
            input.measure_datetime,
            DateTime::parse_from_rfc3339("2024-05-10T13:00:00Z").unwrap()
        );
    }
}
