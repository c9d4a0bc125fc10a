use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use serde_json::json;

use super::parse_id;
use crate::app_state::AppState;
use crate::services::SlotService;
use crate::utils::{ApiError, ApiResponse};

/// Booked 30-minute slots for a month, keyed by date:
/// `{ "slotsByDate": { "2025-03-10": ["14:00", "14:30", "15:00"] } }`.
#[openapi(tag = "Slots")]
#[get("/slots?<companyId>&<year>&<month>")]
#[allow(non_snake_case)]
pub async fn booked_slots(
    state: &State<AppState>,
    companyId: Option<String>,
    year: Option<String>,
    month: Option<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (Some(company_id), Some(year), Some(month)) = (companyId, year, month) else {
        return Err(ApiError::bad_request("companyId, year and month are required"));
    };
    let company_id = parse_id(&company_id, "company")?;

    let (Ok(year), Ok(month)) = (year.trim().parse::<i32>(), month.trim().parse::<u32>()) else {
        return Err(ApiError::bad_request("year and month must be numbers"));
    };
    if !SlotService::is_month(year, month) {
        return Err(ApiError::bad_request("Invalid year or month"));
    }

    let slots = SlotService::month_slots(state.appointments.as_ref(), &company_id, year, month)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid year or month"))?;

    Ok(Json(ApiResponse::success(json!({
        "slotsByDate": SlotService::labels(&slots)
    }))))
}
