use rocket::http::{ContentType, Status};
use serde_json::json;

use crate::helpers::{get_random_email, TestApp, PASSWORD};

#[tokio::test]
async fn register_returns_user_and_tokens() {
    let app = TestApp::new().await;
    let email = get_random_email();

    let (status, body) = app
        .post(
            "/auth/register",
            json!({ "name": "Ana Souza", "email": email, "password": PASSWORD, "phone": "+55 (11) 99999-0000" }),
            None,
        )
        .await;

    assert_eq!(status, Status::Ok);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["phone"], "5511999990000");
    assert_eq!(body["user"]["twoFactorEnabled"], false);
    assert!(body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new().await;
    let email = get_random_email();
    let body = json!({ "name": "Ana", "email": email, "password": PASSWORD });

    let (status, _) = app.post("/auth/register", body.clone(), None).await;
    assert_eq!(status, Status::Ok);

    let (status, body) = app.post("/auth/register", body, None).await;
    assert_eq!(status, Status::Conflict);
    assert_eq!(body, json!({ "success": false, "error": "Email already registered" }));
}

#[tokio::test]
async fn weak_registrations_are_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/auth/register",
            json!({ "name": "Ana", "email": get_random_email(), "password": "short" }),
            None,
        )
        .await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .post(
            "/auth/register",
            json!({ "name": "Ana", "email": "not-an-email", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(status, Status::BadRequest);

    let (status, _) = app
        .post(
            "/auth/register",
            json!({ "name": "Ana", "email": get_random_email(), "password": PASSWORD, "phone": "12" }),
            None,
        )
        .await;
    assert_eq!(status, Status::BadRequest);
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = TestApp::new().await;
    let (_, email) = app.register(None).await;

    let (status, body) = app
        .post("/auth/login", json!({ "email": email, "password": "Wrong123!" }), None)
        .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, body) = app
        .post("/auth/login", json!({ "email": email.to_uppercase(), "password": PASSWORD }), None)
        .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["message"], "Login successful");
    assert!(body["accessToken"].is_string());
}

#[tokio::test]
async fn unknown_users_cannot_log_in() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post("/auth/login", json!({ "email": get_random_email(), "password": PASSWORD }), None)
        .await;
    assert_eq!(status, Status::Unauthorized);
}

#[tokio::test]
async fn refresh_issues_a_new_access_token() {
    let app = TestApp::new().await;
    let email = get_random_email();
    let (_, body) = app
        .post(
            "/auth/register",
            json!({ "name": "Ana", "email": email, "password": PASSWORD }),
            None,
        )
        .await;
    let refresh = body["refreshToken"].as_str().unwrap().to_string();
    let access = body["accessToken"].as_str().unwrap().to_string();

    let (status, body) = app
        .post("/auth/refresh", json!({ "refreshToken": refresh }), None)
        .await;
    assert_eq!(status, Status::Ok);
    let fresh = body["accessToken"].as_str().unwrap();

    let (status, _) = app.get("/2fa/status", Some(fresh)).await;
    assert_eq!(status, Status::Ok);

    // an access token is not a refresh token
    let (status, _) = app
        .post("/auth/refresh", json!({ "refreshToken": access }), None)
        .await;
    assert_eq!(status, Status::Unauthorized);
}

#[tokio::test]
async fn malformed_bodies_get_the_error_shape() {
    let app = TestApp::new().await;
    let response = app
        .client
        .post("/api/v1/auth/login")
        .header(ContentType::JSON)
        .body("{\"email\": 42")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    let body = response.into_json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_routes_get_the_error_shape() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/nope", None).await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(body["success"], false);
}
