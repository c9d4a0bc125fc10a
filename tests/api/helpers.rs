use std::sync::{Arc, Mutex};

use mongodb::bson::oid::ObjectId;
use rocket::http::{ContentType, Header, Method, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};

use booky_server::app_state::AppState;
use booky_server::services::{DeliveryError, MessageSender};
use booky_server::stores::memory::MemoryStore;

pub const PASSWORD: &str = "Password123!";

/// Keeps every message instead of calling WhatsApp.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    failing: Mutex<bool>,
}

impl RecordingSender {
    pub fn fail_deliveries(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Digits of the latest code sent to `phone`.
    pub fn last_code(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == phone)
            .and_then(|(_, body)| {
                body.split(|c: char| !c.is_ascii_digit())
                    .find(|part| part.len() == 6)
                    .map(str::to_string)
            })
    }
}

#[rocket::async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(&self, phone: &str, body: &str) -> Result<(), DeliveryError> {
        if *self.failing.lock().unwrap() {
            return Err(DeliveryError::Rejected {
                status: 500,
                body: "upstream down".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub client: Client,
    pub sender: Arc<RecordingSender>,
    pub store: MemoryStore,
}

impl TestApp {
    pub async fn new() -> Self {
        let sender = Arc::new(RecordingSender::default());
        let store = MemoryStore::new();
        let state = AppState::in_memory(store.clone(), sender.clone());
        let client = Client::tracked(booky_server::build(state))
            .await
            .expect("valid rocket instance");

        TestApp { client, sender, store }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (Status, Value) {
        let mut request = self.client.req(method, format!("/api/v1{}", path));
        if let Some(body) = body {
            request = request.header(ContentType::JSON).body(body.to_string());
        }
        if let Some(token) = token {
            request = request.header(Header::new("Authorization", format!("Bearer {}", token)));
        }

        let response = request.dispatch().await;
        let status = response.status();
        let body = response.into_json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (Status, Value) {
        self.request(Method::Get, path, None, token).await
    }

    pub async fn post(&self, path: &str, body: Value, token: Option<&str>) -> (Status, Value) {
        self.request(Method::Post, path, Some(body), token).await
    }

    /// Registers an owner and returns `(access token, email)`.
    pub async fn register(&self, phone: Option<&str>) -> (String, String) {
        let email = get_random_email();
        let (status, body) = self
            .post(
                "/auth/register",
                json!({ "name": "Ana Souza", "email": email, "password": PASSWORD, "phone": phone }),
                None,
            )
            .await;
        assert_eq!(status, Status::Ok, "{}", body);
        let token = body["accessToken"].as_str().unwrap().to_string();
        (token, email)
    }

    pub async fn create_company(&self, token: &str) -> String {
        let (status, body) = self
            .post("/companies", json!({ "name": "Studio Glow" }), Some(token))
            .await;
        assert_eq!(status, Status::Ok, "{}", body);
        body["company"]["id"].as_str().unwrap().to_string()
    }

    /// Runs the OTP flow for `phone` and returns the phone token.
    pub async fn phone_token(&self, phone: &str) -> String {
        let (status, body) = self.post("/otp/start", json!({ "phone": phone }), None).await;
        assert_eq!(status, Status::Ok, "{}", body);
        let code = self.sender.last_code(phone).expect("code delivered");

        let (status, body) = self
            .post("/otp/verify", json!({ "phone": phone, "code": code }), None)
            .await;
        assert_eq!(status, Status::Ok, "{}", body);
        body["phoneToken"].as_str().unwrap().to_string()
    }

    pub async fn book(
        &self,
        company_id: &str,
        phone_token: &str,
        start: &str,
        duration: i64,
    ) -> (Status, Value) {
        self.post(
            &format!("/companies/{}/appointments", company_id),
            json!({
                "phoneToken": phone_token,
                "clientName": "Bia",
                "startDateTime": start,
                "durationMinutes": duration
            }),
            None,
        )
        .await
    }
}

pub fn get_random_email() -> String {
    format!("{}@example.com", ObjectId::new().to_hex())
}

pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
