//! Stored-image management.
//!
//! Decoded reading images land in a shared content directory under generated
//! names, so concurrent writers need no coordination beyond the idempotent
//! directory creation.

use std::path::PathBuf;

use meter_core::sanitize::sanitize_filename;
use meter_core::{ImagePayload, MeasureError};
use uuid::Uuid;

pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ImageStore { dir: dir.into() }
    }

    /// Persist image bytes under `{customer}_{uuid}.{ext}` inside the content
    /// directory, creating it if absent, and return the resolvable reference.
    /// The UUID keeps names collision-resistant; the sanitized customer
    /// prefix keeps them greppable on disk.
    pub async fn store(
        &self,
        payload: &ImagePayload,
        customer_code: &str,
    ) -> Result<String, MeasureError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MeasureError::Storage(format!("creating content directory: {e}")))?;

        let prefix = sanitize_filename(customer_code);
        let file_name = if prefix.is_empty() {
            format!("{}.{}", Uuid::new_v4(), payload.format.extension())
        } else {
            format!("{}_{}.{}", prefix, Uuid::new_v4(), payload.format.extension())
        };

        tokio::fs::write(self.dir.join(&file_name), &payload.bytes)
            .await
            .map_err(|e| MeasureError::Storage(format!("writing image: {e}")))?;

        tracing::debug!(file = %file_name, "stored reading image");

        Ok(format!("/public/images/{file_name}"))
    }
}
