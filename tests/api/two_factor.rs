use booky_server::models::OneTimeCode;
use booky_server::services::TotpService;
use booky_server::stores::OneTimeCodeStore;
use rocket::http::Status;
use serde_json::json;

use crate::helpers::{get_random_email, unix_now, TestApp, PASSWORD};

/// A code for the step after the current one, so it is accepted (drift of one
/// step) but can never equal the code the server considers current.
fn next_code(secret: &str, email: &str) -> String {
    TotpService::generate_at(secret, email, unix_now() + 30).unwrap()
}

#[tokio::test]
async fn requires_a_bearer_token() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/2fa/status", None).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/2fa/status", Some("not-a-token")).await;
    assert_eq!(status, Status::Unauthorized);
}

#[tokio::test]
async fn verify_before_setup_is_not_initiated() {
    let app = TestApp::new().await;
    let (token, _) = app.register(None).await;

    let (status, body) = app.get("/2fa/status", Some(&token)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["enabled"], false);
    assert_eq!(body["pending"], false);

    let (status, body) = app
        .post("/2fa/verify", json!({ "code": "123456" }), Some(&token))
        .await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Two-factor authentication not initiated");
}

#[tokio::test]
async fn setup_returns_provisioning_material() {
    let app = TestApp::new().await;
    let (token, email) = app.register(None).await;

    let (status, body) = app.post("/2fa/setup", json!({}), Some(&token)).await;
    assert_eq!(status, Status::Ok);

    let secret = body["secret"].as_str().unwrap();
    let uri = body["provisioningUri"].as_str().unwrap();
    assert!(uri.starts_with("otpauth://totp/"));
    assert!(uri.contains(&format!("secret={}", secret)));
    assert!(uri.contains("issuer=Booky"));
    assert!(body["qrImageDataUrl"].as_str().unwrap().starts_with("data:image/png;base64,"));
    assert!(TotpService::generate_at(secret, &email, unix_now()).is_ok());

    let (_, body) = app.get("/2fa/status", Some(&token)).await;
    assert_eq!(body["enabled"], false);
    assert_eq!(body["pending"], true);
}

#[tokio::test]
async fn wrong_code_leaves_the_setup_pending() {
    let app = TestApp::new().await;
    let (token, email) = app.register(None).await;
    let (_, body) = app.post("/2fa/setup", json!({}), Some(&token)).await;
    let secret = body["secret"].as_str().unwrap().to_string();

    let good = next_code(&secret, &email);
    let wrong = if good == "111111" { "222222" } else { "111111" };

    let (status, body) = app
        .post("/2fa/verify", json!({ "code": wrong }), Some(&token))
        .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["success"], false);

    let (_, body) = app.get("/2fa/status", Some(&token)).await;
    assert_eq!(body["enabled"], false);
    assert_eq!(body["pending"], true);
}

#[tokio::test]
async fn full_app_lifecycle() {
    let app = TestApp::new().await;
    let (token, email) = app.register(None).await;

    let (_, body) = app.post("/2fa/setup", json!({ "method": "app" }), Some(&token)).await;
    let secret = body["secret"].as_str().unwrap().to_string();

    let (status, _) = app
        .post("/2fa/verify", json!({ "code": next_code(&secret, &email) }), Some(&token))
        .await;
    assert_eq!(status, Status::Ok);

    let (_, body) = app.get("/2fa/status", Some(&token)).await;
    assert_eq!(body["enabled"], true);
    assert_eq!(body["method"], "app");

    let (status, _) = app.post("/2fa/setup", json!({}), Some(&token)).await;
    assert_eq!(status, Status::Conflict);

    // login now stops at a challenge
    let (status, body) = app
        .post("/auth/login", json!({ "email": email, "password": PASSWORD }), None)
        .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["twoFactorRequired"], true);
    assert!(body.get("accessToken").is_none());
    let challenge = body["challengeToken"].as_str().unwrap().to_string();

    // the challenge is not an access token
    let (status, _) = app.get("/2fa/status", Some(&challenge)).await;
    assert_eq!(status, Status::Unauthorized);

    let (status, body) = app
        .post(
            "/auth/login/2fa",
            json!({ "challengeToken": challenge, "code": next_code(&secret, &email) }),
            None,
        )
        .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["user"]["twoFactorEnabled"], true);
    assert!(body["accessToken"].is_string());

    // disable needs the password
    let (status, _) = app
        .post("/2fa/disable", json!({ "password": "Wrong123!" }), Some(&token))
        .await;
    assert_eq!(status, Status::Unauthorized);

    let (status, _) = app
        .post("/2fa/disable", json!({ "password": PASSWORD }), Some(&token))
        .await;
    assert_eq!(status, Status::Ok);

    let (_, body) = app.get("/2fa/status", Some(&token)).await;
    assert_eq!(body["enabled"], false);
    assert_eq!(body["pending"], false);

    let (_, body) = app
        .post("/auth/login", json!({ "email": email, "password": PASSWORD }), None)
        .await;
    assert!(body["accessToken"].is_string());
}

#[tokio::test]
async fn whatsapp_method_sends_codes_to_the_account_phone() {
    let app = TestApp::new().await;
    let phone = "5511977776666";
    let (token, email) = app.register(Some(phone)).await;

    let (status, body) = app
        .post("/2fa/setup", json!({ "method": "whatsapp" }), Some(&token))
        .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["method"], "whatsapp");
    assert!(body.get("secret").is_none());

    let code = app.sender.last_code(phone).unwrap();
    let (status, _) = app
        .post("/2fa/verify", json!({ "code": code }), Some(&token))
        .await;
    assert_eq!(status, Status::Ok);

    let (_, body) = app
        .post("/auth/login", json!({ "email": email, "password": PASSWORD }), None)
        .await;
    assert_eq!(body["method"], "whatsapp");
    let challenge = body["challengeToken"].as_str().unwrap().to_string();
    let code = app.sender.last_code(phone).unwrap();

    let (status, _) = app
        .post("/auth/login/2fa", json!({ "challengeToken": challenge, "code": code }), None)
        .await;
    assert_eq!(status, Status::Ok);
}

#[tokio::test]
async fn whatsapp_method_needs_a_phone() {
    let app = TestApp::new().await;
    let (token, _) = app.register(None).await;

    let (status, _) = app
        .post("/2fa/setup", json!({ "method": "whatsapp" }), Some(&token))
        .await;
    assert_eq!(status, Status::BadRequest);

    let (_, body) = app.get("/2fa/status", Some(&token)).await;
    assert_eq!(body["pending"], false);
}

#[tokio::test]
async fn failed_whatsapp_setup_keeps_the_app_enrollment() {
    let app = TestApp::new().await;
    let (token, email) = app.register(Some("5511977776666")).await;

    let (_, body) = app.post("/2fa/setup", json!({ "method": "app" }), Some(&token)).await;
    let secret = body["secret"].as_str().unwrap().to_string();

    app.sender.fail_deliveries();
    let (status, _) = app
        .post("/2fa/setup", json!({ "method": "whatsapp" }), Some(&token))
        .await;
    assert_eq!(status, Status::BadGateway);

    let (_, body) = app.get("/2fa/status", Some(&token)).await;
    assert_eq!(body["method"], "app");
    assert_eq!(body["pending"], true);

    let (status, _) = app
        .post("/2fa/verify", json!({ "code": next_code(&secret, &email) }), Some(&token))
        .await;
    assert_eq!(status, Status::Ok);
}

#[tokio::test]
async fn disable_discards_a_pending_whatsapp_code() {
    let app = TestApp::new().await;
    let phone = "5511966665555";
    let email = get_random_email();
    let (_, body) = app
        .post(
            "/auth/register",
            json!({ "name": "Rui Lima", "email": email, "password": PASSWORD, "phone": phone }),
            None,
        )
        .await;
    let token = body["accessToken"].as_str().unwrap().to_string();
    let subject = OneTimeCode::two_factor_subject(body["user"]["id"].as_str().unwrap());

    app.post("/2fa/setup", json!({ "method": "whatsapp" }), Some(&token)).await;
    let code = app.sender.last_code(phone).unwrap();
    let (status, _) = app.post("/2fa/verify", json!({ "code": code }), Some(&token)).await;
    assert_eq!(status, Status::Ok);

    // a login challenge leaves a code waiting
    let (_, body) = app
        .post("/auth/login", json!({ "email": email, "password": PASSWORD }), None)
        .await;
    assert_eq!(body["twoFactorRequired"], true);
    assert!(app.store.find_code(&subject).await.unwrap().is_some());

    let (status, _) = app
        .post("/2fa/disable", json!({ "password": PASSWORD }), Some(&token))
        .await;
    assert_eq!(status, Status::Ok);
    assert!(app.store.find_code(&subject).await.unwrap().is_none());

    let (_, body) = app
        .post("/auth/login", json!({ "email": email, "password": PASSWORD }), None)
        .await;
    assert!(body["accessToken"].is_string());
}
