use std::collections::HashSet;

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
    BusinessHours, Company, CompanyResponse, CreateCompanyDto, CreateServiceDto, ServiceOffering,
    ServiceResponse, UpdateBusinessHoursDto,
};
use crate::services::slots::SLOT_MINUTES;
use crate::services::{AvailabilityService, SlotService};
use crate::utils::{normalize_phone, parse_clock, parse_date, validate_phone, ApiError, ApiResponse};

const MAX_SERVICE_MINUTES: i64 = 12 * 60;

/// One entry per weekday at most; open before close unless the day is closed.
fn validate_hours(hours: &[BusinessHours]) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for entry in hours {
        if !seen.insert(entry.day) {
            return Err(ApiError::bad_request(format!(
                "Duplicate business hours for {:?}",
                entry.day
            )));
        }
        if entry.closed {
            continue;
        }
        match (parse_clock(&entry.open), parse_clock(&entry.close)) {
            (Some(open), Some(close)) if open < close => {}
            (Some(_), Some(_)) => {
                return Err(ApiError::bad_request("Opening time must be before closing time"));
            }
            _ => return Err(ApiError::bad_request("Times must use the HH:MM format")),
        }
    }
    Ok(())
}

#[openapi(tag = "Companies")]
#[post("/companies", data = "<dto>")]
pub async fn create_company(
    state: &State<AppState>,
    auth: AuthGuard,
    dto: Json<CreateCompanyDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let dto = dto.into_inner();
    let name = dto.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Company name is required"));
    }

    let phone = dto.phone.as_deref().map(normalize_phone);
    if phone.as_deref().is_some_and(|p| !validate_phone(p)) {
        return Err(ApiError::bad_request("Invalid phone number"));
    }

    let business_hours = dto.business_hours.unwrap_or_else(BusinessHours::default_week);
    validate_hours(&business_hours)?;

    let now = DateTime::now();
    let company = Company {
        id: None,
        owner_id: auth.user_id,
        name,
        phone,
        address: dto.address,
        business_hours,
        created_at: now,
        updated_at: now,
    };
    let company = state.companies.insert_company(company).await?;

    info!("Company {} created by {}", company.name, auth.user_id);
    Ok(Json(ApiResponse::success_with_message(
        "Company created",
        json!({ "company": CompanyResponse::from(company) }),
    )))
}

#[openapi(tag = "Companies")]
#[get("/companies/<id>")]
pub async fn get_company(
    state: &State<AppState>,
    id: &str,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let company = find_company(state, &parse_id(id, "company")?).await?;
    Ok(Json(ApiResponse::success(json!({
        "company": CompanyResponse::from(company)
    }))))
}

/// Replaces the whole week; days left out are closed.
#[openapi(tag = "Companies")]
#[put("/companies/<id>/hours", data = "<dto>")]
pub async fn update_hours(
    state: &State<AppState>,
    auth: AuthGuard,
    id: &str,
    dto: Json<UpdateBusinessHoursDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let company_id = parse_id(id, "company")?;
    owned_company(state, &company_id, &auth).await?;
    validate_hours(&dto.hours)?;

    if !state.companies.set_business_hours(&company_id, &dto.hours).await? {
        return Err(ApiError::not_found("Company not found"));
    }

    Ok(Json(ApiResponse::success(json!({
        "businessHours": dto.hours
    }))))
}

#[openapi(tag = "Companies")]
#[post("/companies/<id>/services", data = "<dto>")]
pub async fn create_service(
    state: &State<AppState>,
    auth: AuthGuard,
    id: &str,
    dto: Json<CreateServiceDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let company_id = parse_id(id, "company")?;
    owned_company(state, &company_id, &auth).await?;

    let name = dto.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Service name is required"));
    }
    if !(1..=MAX_SERVICE_MINUTES).contains(&dto.duration_minutes) {
        return Err(ApiError::bad_request(format!(
            "Duration must be between 1 and {} minutes",
            MAX_SERVICE_MINUTES
        )));
    }
    if dto.price_cents < 0 {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }

    let service = ServiceOffering {
        id: None,
        company_id,
        name,
        duration_minutes: dto.duration_minutes,
        price_cents: dto.price_cents,
        active: true,
        created_at: DateTime::now(),
    };
    let service = state.companies.insert_service(service).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Service created",
        json!({ "service": ServiceResponse::from(service) }),
    )))
}

#[openapi(tag = "Companies")]
#[get("/companies/<id>/services")]
pub async fn list_services(
    state: &State<AppState>,
    id: &str,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let company_id = parse_id(id, "company")?;
    find_company(state, &company_id).await?;

    let services: Vec<ServiceResponse> = state
        .companies
        .list_services(&company_id)
        .await?
        .into_iter()
        .map(ServiceResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(json!({ "services": services }))))
}

/// Open start times on `date`. With `serviceId` a start is offered only when
/// the whole service fits before closing without touching a booked slot.
#[openapi(tag = "Companies")]
#[get("/companies/<id>/availability?<date>&<serviceId>")]
#[allow(non_snake_case)]
pub async fn availability(
    state: &State<AppState>,
    id: &str,
    date: Option<String>,
    serviceId: Option<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let company_id = parse_id(id, "company")?;
    let date = date
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| ApiError::bad_request("date must use the YYYY-MM-DD format"))?;
    let company = find_company(state, &company_id).await?;

    let duration = match serviceId.as_deref() {
        Some(service_id) => {
            let service_id = parse_id(service_id, "service")?;
            state
                .companies
                .find_service(&service_id)
                .await?
                .filter(|s| s.company_id == company_id && s.active)
                .ok_or_else(|| ApiError::not_found("Service not found"))?
                .duration_minutes
        }
        None => SLOT_MINUTES,
    };

    let open = AvailabilityService::open_slots_on(&company, date);
    let booked = SlotService::day_slots(state.appointments.as_ref(), &company_id, date).await?;
    let starts = AvailabilityService::available_starts(&open, &booked, duration, date);

    Ok(Json(ApiResponse::success(json!({
        "date": date.format("%Y-%m-%d").to_string(),
        "durationMinutes": duration,
        "slots": starts.into_iter().map(SlotService::label).collect::<Vec<_>>(),
        "booked": booked.into_iter().map(SlotService::label).collect::<Vec<_>>()
    }))))
}
