use rocket::http::{Method, Status};
use serde_json::json;

use crate::helpers::TestApp;

const PHONE: &str = "5511999990000";

async fn owner_with_company(app: &TestApp) -> (String, String) {
    let (token, _) = app.register(None).await;
    let company_id = app.create_company(&token).await;
    (token, company_id)
}

#[tokio::test]
async fn booking_needs_a_verified_phone() {
    let app = TestApp::new().await;
    let (owner, company_id) = owner_with_company(&app).await;

    let (status, body) = app.book(&company_id, "forged", "2025-03-10T14:00", 30).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["error"], "Phone verification required");

    // an owner's access token is not a phone token
    let (status, _) = app.book(&company_id, &owner, "2025-03-10T14:00", 30).await;
    assert_eq!(status, Status::Unauthorized);
}

#[tokio::test]
async fn booking_stores_the_verified_phone() {
    let app = TestApp::new().await;
    let (_, company_id) = owner_with_company(&app).await;
    let phone_token = app.phone_token(PHONE).await;

    let (status, body) = app.book(&company_id, &phone_token, "2025-03-10T14:00", 90).await;
    assert_eq!(status, Status::Ok);
    let appointment = &body["appointment"];
    assert_eq!(appointment["clientPhone"], PHONE);
    assert_eq!(appointment["startDateTime"], "2025-03-10T14:00");
    assert_eq!(appointment["durationMinutes"], 90);
    assert_eq!(appointment["status"], "scheduled");
}

#[tokio::test]
async fn taken_slots_are_a_conflict() {
    let app = TestApp::new().await;
    let (_, company_id) = owner_with_company(&app).await;
    let phone_token = app.phone_token(PHONE).await;

    let (status, _) = app.book(&company_id, &phone_token, "2025-03-10T14:00", 60).await;
    assert_eq!(status, Status::Ok);

    for start in ["2025-03-10T14:00", "2025-03-10T14:30", "2025-03-10T13:30"] {
        let (status, body) = app.book(&company_id, &phone_token, start, 60).await;
        assert_eq!(status, Status::Conflict, "{}", start);
        assert_eq!(body["error"], "Requested time is not available");
    }

    let (status, _) = app.book(&company_id, &phone_token, "2025-03-10T15:00", 60).await;
    assert_eq!(status, Status::Ok);
}

#[tokio::test]
async fn starts_outside_hours_or_off_grid_are_refused() {
    let app = TestApp::new().await;
    let (_, company_id) = owner_with_company(&app).await;
    let phone_token = app.phone_token(PHONE).await;

    for start in [
        "2025-03-10T08:00", // before opening
        "2025-03-10T17:30", // 60 min would pass closing
        "2025-03-09T10:00", // Sunday
        "2025-03-10T10:10", // off the 30-minute grid
    ] {
        let (status, _) = app.book(&company_id, &phone_token, start, 60).await;
        assert_eq!(status, Status::Conflict, "{}", start);
    }

    let (status, _) = app.book(&company_id, &phone_token, "next tuesday", 60).await;
    assert_eq!(status, Status::BadRequest);
    let (status, _) = app.book(&company_id, &phone_token, "2025-03-10T10:00", 0).await;
    assert_eq!(status, Status::BadRequest);
}

#[tokio::test]
async fn services_set_the_duration() {
    let app = TestApp::new().await;
    let (owner, company_id) = owner_with_company(&app).await;
    let (_, body) = app
        .post(
            &format!("/companies/{}/services", company_id),
            json!({ "name": "Escova", "durationMinutes": 90 }),
            Some(&owner),
        )
        .await;
    let service_id = body["service"]["id"].as_str().unwrap().to_string();
    let phone_token = app.phone_token(PHONE).await;

    let (status, body) = app
        .post(
            &format!("/companies/{}/appointments", company_id),
            json!({
                "phoneToken": phone_token,
                "clientName": "Bia",
                "startDateTime": "2025-03-10T10:00",
                "serviceId": service_id,
                "durationMinutes": 15
            }),
            None,
        )
        .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["appointment"]["durationMinutes"], 90);
    assert_eq!(body["appointment"]["serviceId"], service_id);
}

#[tokio::test]
async fn owners_list_the_month() {
    let app = TestApp::new().await;
    let (owner, company_id) = owner_with_company(&app).await;
    let (stranger, _) = app.register(None).await;
    let phone_token = app.phone_token(PHONE).await;

    app.book(&company_id, &phone_token, "2025-03-11T09:00", 30).await;
    app.book(&company_id, &phone_token, "2025-03-10T09:00", 30).await;
    app.book(&company_id, &phone_token, "2025-04-01T09:00", 30).await;

    let path = format!("/companies/{}/appointments?year=2025&month=3", company_id);
    let (status, _) = app.get(&path, Some(&stranger)).await;
    assert_eq!(status, Status::Forbidden);
    let (status, _) = app.get(&path, None).await;
    assert_eq!(status, Status::Unauthorized);

    let (status, body) = app.get(&path, Some(&owner)).await;
    assert_eq!(status, Status::Ok);
    let starts: Vec<_> = body["appointments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["startDateTime"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(starts, vec!["2025-03-10T09:00", "2025-03-11T09:00"]);

    let (status, _) = app
        .get(&format!("/companies/{}/appointments?year=2025&month=13", company_id), Some(&owner))
        .await;
    assert_eq!(status, Status::BadRequest);
}

#[tokio::test]
async fn status_transitions() {
    let app = TestApp::new().await;
    let (owner, company_id) = owner_with_company(&app).await;
    let (stranger, _) = app.register(None).await;
    let phone_token = app.phone_token(PHONE).await;

    let (_, body) = app.book(&company_id, &phone_token, "2025-03-10T14:00", 60).await;
    let id = body["appointment"]["id"].as_str().unwrap().to_string();
    let path = format!("/appointments/{}/status", id);

    let (status, _) = app
        .request(Method::Patch, &path, Some(json!({ "status": "confirmed" })), Some(&stranger))
        .await;
    assert_eq!(status, Status::Forbidden);

    let (status, body) = app
        .request(Method::Patch, &path, Some(json!({ "status": "confirmed" })), Some(&owner))
        .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["appointment"]["status"], "confirmed");

    let (status, body) = app
        .request(Method::Patch, &path, Some(json!({ "status": "scheduled" })), Some(&owner))
        .await;
    assert_eq!(status, Status::Conflict);
    assert_eq!(body["error"], "Cannot change status from confirmed to scheduled");

    let (status, _) = app
        .request(Method::Patch, &path, Some(json!({ "status": "canceled" })), Some(&owner))
        .await;
    assert_eq!(status, Status::Ok);

    // canceled is final, and frees the slot
    let (status, _) = app
        .request(Method::Patch, &path, Some(json!({ "status": "completed" })), Some(&owner))
        .await;
    assert_eq!(status, Status::Conflict);

    let (status, _) = app.book(&company_id, &phone_token, "2025-03-10T14:00", 60).await;
    assert_eq!(status, Status::Ok);
}

#[tokio::test]
async fn unknown_appointments_are_not_found() {
    let app = TestApp::new().await;
    let (owner, _) = owner_with_company(&app).await;
    let (status, _) = app
        .request(
            Method::Patch,
            "/appointments/65f000000000000000000000/status",
            Some(json!({ "status": "confirmed" })),
            Some(&owner),
        )
        .await;
    assert_eq!(status, Status::NotFound);
}
