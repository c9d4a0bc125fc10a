use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;

use crate::utils::to_naive;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Canceled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    pub const ACTIVE: [AppointmentStatus; 2] =
        [AppointmentStatus::Scheduled, AppointmentStatus::Confirmed];

    /// Only active appointments occupy slots.
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Canceled => "canceled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, Confirmed | Canceled | Completed | NoShow)
                | (Confirmed, Canceled | Completed | NoShow)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Appointment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub service_id: Option<ObjectId>,
    pub client_name: String,
    pub client_phone: String,
    /// Business wall-clock time, stored as UTC.
    pub start_date_time: DateTime,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentDto {
    pub phone_token: String,
    pub client_name: String,
    /// `YYYY-MM-DDTHH:MM`
    pub start_date_time: String,
    pub service_id: Option<String>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateAppointmentStatusDto {
    pub status: AppointmentStatus,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: String,
    pub company_id: String,
    pub service_id: Option<String>,
    pub client_name: String,
    pub client_phone: String,
    pub start_date_time: String,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        AppointmentResponse {
            id: appointment.id.map(|id| id.to_hex()).unwrap_or_default(),
            company_id: appointment.company_id.to_hex(),
            service_id: appointment.service_id.map(|id| id.to_hex()),
            client_name: appointment.client_name,
            client_phone: appointment.client_phone,
            start_date_time: to_naive(appointment.start_date_time)
                .format("%Y-%m-%dT%H:%M")
                .to_string(),
            duration_minutes: appointment.duration_minutes,
            status: appointment.status,
        }
    }
}
