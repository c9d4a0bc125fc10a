use log::{info, warn};
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("WhatsApp delivery is not configured")]
    NotConfigured,
    #[error("WhatsApp request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("WhatsApp rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Out-of-band channel for one-time codes.
#[rocket::async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, phone: &str, body: &str) -> Result<(), DeliveryError>;
}

/// WhatsApp Cloud API text messages.
pub struct WhatsAppService {
    client: Client,
}

impl WhatsAppService {
    pub fn new() -> Self {
        WhatsAppService {
            client: Client::new(),
        }
    }

    fn credentials() -> Result<(String, String), DeliveryError> {
        match (Config::whatsapp_token(), Config::whatsapp_phone_number_id()) {
            (Some(token), Some(phone_number_id)) => Ok((token, phone_number_id)),
            _ => Err(DeliveryError::NotConfigured),
        }
    }

    pub fn code_message(code: &str) -> String {
        format!(
            "Your Booky verification code is {}. It expires in {} minutes. Do not share it with anyone.",
            code,
            Config::otp_ttl_secs() / 60
        )
    }
}

impl Default for WhatsAppService {
    fn default() -> Self {
        Self::new()
    }
}

#[rocket::async_trait]
impl MessageSender for WhatsAppService {
    async fn send_text(&self, phone: &str, body: &str) -> Result<(), DeliveryError> {
        let (token, phone_number_id) = Self::credentials().inspect_err(|_| {
            warn!("WhatsApp credentials not configured. Skipping message send.");
        })?;

        let url = format!("{}/{}/messages", Config::whatsapp_api_base(), phone_number_id);
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": phone,
            "type": "text",
            "text": { "preview_url": false, "body": body },
        });

        let res = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_else(|_| "WhatsApp error".to_string());
            return Err(DeliveryError::Rejected { status, body });
        }

        info!("WhatsApp message delivered to {}", mask_phone(phone));
        Ok(())
    }
}

/// `5511999990000` -> `*********0000`
pub fn mask_phone(phone: &str) -> String {
    let visible = phone.len().saturating_sub(4);
    phone
        .chars()
        .enumerate()
        .map(|(i, c)| if i < visible { '*' } else { c })
        .collect()
}
