//! The measure entity and billing-period math.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of utility meter a reading comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasureType {
    Water,
    Gas,
}

impl MeasureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureType::Water => "WATER",
            MeasureType::Gas => "GAS",
        }
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasureType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WATER" => Ok(MeasureType::Water),
            "GAS" => Ok(MeasureType::Gas),
            _ => Err(()),
        }
    }
}

/// A persisted meter reading.
///
/// `confirmed` is monotonic: it moves from `false` to `true` exactly once,
/// and `measure_value` is mutable only until that transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measure {
    pub measure_uuid: Uuid,
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub measure_datetime: DateTime<Utc>,
    pub measure_value: f64,
    pub image_url: String,
    pub confirmed: bool,
}

/// The calendar month containing a measure's datetime, as inclusive bounds.
///
/// At most one reading per `(customer_code, measure_type)` may fall inside
/// any one billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BillingPeriod {
    /// Period bounds for the calendar month containing `at`.
    pub fn containing(at: DateTime<Utc>) -> Self {
        let (year, month) = (at.year(), at.month());
        let start = first_instant_of(year, month);
        let next = if month == 12 {
            first_instant_of(year + 1, 1)
        } else {
            first_instant_of(year, month + 1)
        };
        BillingPeriod {
            start,
            end: next - Duration::milliseconds(1),
        }
    }

    /// `YYYY-MM` key used by the store's uniqueness constraint.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.start.year(), self.start.month())
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

fn first_instant_of(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first day of a month is always a valid instant")
}
