#[macro_use]
extern crate rocket;

pub mod app_state;
pub mod config;
pub mod db;
pub mod guards;
pub mod models;
pub mod routes;
pub mod services;
pub mod stores;
pub mod utils;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

use crate::app_state::AppState;
use crate::utils::ErrorBody;

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, PATCH, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new("Bad request"))
}

#[catch(401)]
fn unauthorized() -> Json<ErrorBody> {
    Json(ErrorBody::new("Unauthorized"))
}

#[catch(404)]
fn not_found() -> Json<ErrorBody> {
    Json(ErrorBody::new("Resource not found (check /api/v1 prefix)"))
}

/// Body that failed to deserialize; reported as 400.
#[catch(422)]
fn unprocessable() -> (Status, Json<ErrorBody>) {
    (Status::BadRequest, Json(ErrorBody::new("Malformed request body")))
}

#[catch(500)]
fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody::new("Internal server error"))
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/api/v1/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- BUILD ----------------------------- */

fn base() -> Rocket<Build> {
    rocket::build()
        .attach(CORS)
        .mount("/", routes![options_handler])
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Auth
                routes::auth::register,
                routes::auth::login,
                routes::auth::login_two_factor,
                routes::auth::refresh_token,
                // Phone verification
                routes::otp::start_otp,
                routes::otp::verify_otp,
                // Two-factor
                routes::two_factor::status,
                routes::two_factor::setup,
                routes::two_factor::verify,
                routes::two_factor::disable,
                // Companies
                routes::companies::create_company,
                routes::companies::get_company,
                routes::companies::update_hours,
                routes::companies::create_service,
                routes::companies::list_services,
                routes::companies::availability,
                // Appointments
                routes::appointments::create_appointment,
                routes::appointments::list_appointments,
                routes::appointments::update_status,
                // Slots
                routes::slots::booked_slots,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register(
            "/",
            catchers![bad_request, unauthorized, not_found, unprocessable, internal_error],
        )
}

/// App with the given state already managed. Used by the integration tests.
pub fn build(state: AppState) -> Rocket<Build> {
    base().manage(state)
}

/// App whose storage is chosen at ignition from `Config::storage()`.
pub fn rocket() -> Rocket<Build> {
    base().attach(db::init())
}
