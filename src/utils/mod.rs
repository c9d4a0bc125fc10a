pub mod response;
pub mod validation;

use chrono::{TimeZone, Utc};
use mongodb::bson::DateTime;

pub use response::{ApiError, ApiResponse, ErrorBody};
pub use validation::*;

/// Appointment times are wall-clock values stored as if they were UTC.
pub fn to_bson(dt: chrono::NaiveDateTime) -> DateTime {
    DateTime::from_millis(dt.and_utc().timestamp_millis())
}

pub fn to_naive(dt: DateTime) -> chrono::NaiveDateTime {
    to_utc(dt).naive_utc()
}

pub fn to_utc(dt: DateTime) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(dt.timestamp_millis())
        .single()
        .unwrap_or_default()
}
