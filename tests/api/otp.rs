use rocket::http::Status;
use serde_json::json;

use crate::helpers::TestApp;

const PHONE: &str = "5511999990000";

#[tokio::test]
async fn start_then_verify_returns_a_phone_token() {
    let app = TestApp::new().await;

    let (status, body) = app.post("/otp/start", json!({ "phone": "+55 11 99999-0000" }), None).await;
    assert_eq!(status, Status::Ok);
    assert!(body["expiresAt"].is_string());
    assert_eq!(app.sender.count(), 1);

    let code = app.sender.last_code(PHONE).unwrap();
    assert_eq!(code.len(), 6);

    let (status, body) = app
        .post("/otp/verify", json!({ "phone": PHONE, "code": code }), None)
        .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["verified"], true);
    assert!(body["phoneToken"].is_string());

    // codes are single use
    let (status, _) = app
        .post("/otp/verify", json!({ "phone": PHONE, "code": code }), None)
        .await;
    assert_eq!(status, Status::Unauthorized);
}

#[tokio::test]
async fn invalid_phones_are_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app.post("/otp/start", json!({ "phone": "123" }), None).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Invalid phone number");
    assert_eq!(app.sender.count(), 0);
}

#[tokio::test]
async fn wrong_code_is_unauthorized_and_keeps_the_pending_code() {
    let app = TestApp::new().await;
    app.post("/otp/start", json!({ "phone": PHONE }), None).await;
    let code = app.sender.last_code(PHONE).unwrap();

    let (status, body) = app
        .post("/otp/verify", json!({ "phone": PHONE, "code": "000000" }), None)
        .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .post("/otp/verify", json!({ "phone": PHONE, "code": code }), None)
        .await;
    assert_eq!(status, Status::Ok);
}

#[tokio::test]
async fn malformed_codes_are_bad_requests() {
    let app = TestApp::new().await;
    app.post("/otp/start", json!({ "phone": PHONE }), None).await;

    for code in ["12345", "1234567", "12a456"] {
        let (status, _) = app
            .post("/otp/verify", json!({ "phone": PHONE, "code": code }), None)
            .await;
        assert_eq!(status, Status::BadRequest, "{}", code);
    }
}

#[tokio::test]
async fn attempts_run_out() {
    let app = TestApp::new().await;
    app.post("/otp/start", json!({ "phone": PHONE }), None).await;
    let code = app.sender.last_code(PHONE).unwrap();

    for _ in 0..5 {
        let (status, _) = app
            .post("/otp/verify", json!({ "phone": PHONE, "code": "000000" }), None)
            .await;
        assert_eq!(status, Status::Unauthorized);
    }

    let (status, _) = app
        .post("/otp/verify", json!({ "phone": PHONE, "code": code }), None)
        .await;
    assert_eq!(status, Status::TooManyRequests);
}

#[tokio::test]
async fn starts_are_rate_limited_per_phone() {
    let app = TestApp::new().await;
    for _ in 0..3 {
        let (status, _) = app.post("/otp/start", json!({ "phone": PHONE }), None).await;
        assert_eq!(status, Status::Ok);
    }

    let (status, body) = app.post("/otp/start", json!({ "phone": PHONE }), None).await;
    assert_eq!(status, Status::TooManyRequests);
    assert_eq!(body["success"], false);

    let (status, _) = app.post("/otp/start", json!({ "phone": "5511988887777" }), None).await;
    assert_eq!(status, Status::Ok);
}

#[tokio::test]
async fn delivery_failure_is_a_bad_gateway() {
    let app = TestApp::new().await;
    app.sender.fail_deliveries();

    let (status, body) = app.post("/otp/start", json!({ "phone": PHONE }), None).await;
    assert_eq!(status, Status::BadGateway);
    assert_eq!(body["error"], "Failed to send verification code");

    // nothing pending after a failed delivery
    let (status, _) = app
        .post("/otp/verify", json!({ "phone": PHONE, "code": "123456" }), None)
        .await;
    assert_eq!(status, Status::Unauthorized);
}
