//! Domain logic for the utility meter reading service.
//!
//! Everything in this crate is pure: the measure entity and its billing
//! period math, the `data:image/...` payload codec, the filename sanitizer,
//! numeric reading extraction, and the error taxonomy shared by the API.
//! I/O (persistence, recognition calls, image storage) lives in the app
//! crate.

pub mod error;
pub mod measure;
pub mod payload;
pub mod reading;
pub mod sanitize;

pub use error::{FieldIssue, MeasureError};
pub use measure::{BillingPeriod, Measure, MeasureType};
pub use payload::{ImageFormat, ImagePayload, PayloadError};
