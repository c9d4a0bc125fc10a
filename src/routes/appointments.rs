use log::info;
use mongodb::bson::DateTime;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use serde_json::json;

use super::{find_company, owned_company, parse_id};
use crate::app_state::AppState;
use crate::guards::AuthGuard;
use crate::models::{
    Appointment, AppointmentResponse, AppointmentStatus, CreateAppointmentDto,
    UpdateAppointmentStatusDto,
};
use crate::services::slots::SLOT_MINUTES;
use crate::services::whatsapp::mask_phone;
use crate::services::{AvailabilityService, JwtService, SlotService, TokenKind};
use crate::utils::{parse_start, to_bson, ApiError, ApiResponse};

const MAX_APPOINTMENT_MINUTES: i64 = 12 * 60;

/// Books a slot for a client whose phone passed `/otp/verify`.
#[openapi(tag = "Appointments")]
#[post("/companies/<id>/appointments", data = "<dto>")]
pub async fn create_appointment(
    state: &State<AppState>,
    id: &str,
    dto: Json<CreateAppointmentDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let company_id = parse_id(id, "company")?;
    let claims = JwtService::verify_token(&dto.phone_token, TokenKind::Phone)
        .map_err(|_| ApiError::unauthorized("Phone verification required"))?;

    let client_name = dto.client_name.trim().to_string();
    if client_name.is_empty() {
        return Err(ApiError::bad_request("Client name is required"));
    }
    let start = parse_start(&dto.start_date_time)
        .ok_or_else(|| ApiError::bad_request("startDateTime must look like 2025-03-10T14:00"))?;

    let company = find_company(state, &company_id).await?;

    let (service_id, duration) = match dto.service_id.as_deref() {
        Some(service_id) => {
            let service = state
                .companies
                .find_service(&parse_id(service_id, "service")?)
                .await?
                .filter(|s| s.company_id == company_id && s.active)
                .ok_or_else(|| ApiError::not_found("Service not found"))?;
            (service.id, service.duration_minutes)
        }
        None => (None, dto.duration_minutes.unwrap_or(SLOT_MINUTES)),
    };
    if !(1..=MAX_APPOINTMENT_MINUTES).contains(&duration) {
        return Err(ApiError::bad_request(format!(
            "Duration must be between 1 and {} minutes",
            MAX_APPOINTMENT_MINUTES
        )));
    }

    // TODO: two concurrent requests can both pass this check; needs a unique
    // (company_id, slot) index or a transaction around the insert.
    let booked = SlotService::day_slots(state.appointments.as_ref(), &company_id, start.date()).await?;
    if !AvailabilityService::is_bookable(&company, &booked, start, duration) {
        return Err(ApiError::conflict("Requested time is not available"));
    }

    let now = DateTime::now();
    let appointment = Appointment {
        id: None,
        company_id,
        service_id,
        client_name,
        client_phone: claims.sub,
        start_date_time: to_bson(start),
        duration_minutes: duration,
        status: AppointmentStatus::Scheduled,
        created_at: now,
        updated_at: now,
    };
    let appointment = state.appointments.insert_appointment(appointment).await?;

    info!(
        "Appointment booked at {} for {} ({} min)",
        start,
        mask_phone(&appointment.client_phone),
        duration
    );
    Ok(Json(ApiResponse::success_with_message(
        "Appointment booked",
        json!({ "appointment": AppointmentResponse::from(appointment) }),
    )))
}

/// Every appointment of the month, whatever its status.
#[openapi(tag = "Appointments")]
#[get("/companies/<id>/appointments?<year>&<month>")]
pub async fn list_appointments(
    state: &State<AppState>,
    auth: AuthGuard,
    id: &str,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let company_id = parse_id(id, "company")?;
    let (Some(year), Some(month)) = (year, month) else {
        return Err(ApiError::bad_request("year and month are required"));
    };
    let (from, to) = SlotService::month_range(year, month)
        .filter(|_| SlotService::is_month(year, month))
        .ok_or_else(|| ApiError::bad_request("Invalid year or month"))?;

    owned_company(state, &company_id, &auth).await?;

    let appointments: Vec<AppointmentResponse> = state
        .appointments
        .appointments_between(&company_id, to_bson(from), to_bson(to), None)
        .await?
        .into_iter()
        .map(AppointmentResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(json!({ "appointments": appointments }))))
}

#[openapi(tag = "Appointments")]
#[patch("/appointments/<id>/status", data = "<dto>")]
pub async fn update_status(
    state: &State<AppState>,
    auth: AuthGuard,
    id: &str,
    dto: Json<UpdateAppointmentStatusDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let appointment_id = parse_id(id, "appointment")?;
    let mut appointment = state
        .appointments
        .find_appointment(&appointment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

    owned_company(state, &appointment.company_id, &auth).await?;

    if !appointment.status.can_transition_to(dto.status) {
        return Err(ApiError::conflict(format!(
            "Cannot change status from {} to {}",
            appointment.status.as_str(),
            dto.status.as_str()
        )));
    }

    let now = DateTime::now();
    if !state
        .appointments
        .set_appointment_status(&appointment_id, dto.status, now)
        .await?
    {
        return Err(ApiError::not_found("Appointment not found"));
    }
    appointment.status = dto.status;
    appointment.updated_at = now;

    info!("Appointment {} is now {}", appointment_id, dto.status.as_str());
    Ok(Json(ApiResponse::success(json!({
        "appointment": AppointmentResponse::from(appointment)
    }))))
}
