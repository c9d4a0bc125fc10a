use std::sync::Arc;

use log::{error, info, warn};
use mongodb::{Client, Database};
use rocket::fairing::AdHoc;

use crate::app_state::AppState;
use crate::config::Config;
use crate::services::otp::CODE_LENGTHS;
use crate::services::WhatsAppService;
use crate::stores::memory::MemoryStore;
use crate::stores::mongo::MongoStore;
use crate::stores::StoreError;

/// Builds the store selected by `storage` and manages the resulting `AppState`.
/// Launch is aborted when MongoDB is selected but unreachable.
pub fn init() -> AdHoc {
    AdHoc::try_on_ignite("Storage", |rocket| async {
        for warning in config_warnings() {
            warn!("{}", warning);
        }
        let messenger = Arc::new(WhatsAppService::new());

        match Config::storage().as_str() {
            "memory" => {
                warn!("Using in-memory storage; data is lost on restart");
                Ok(rocket.manage(AppState::in_memory(MemoryStore::new(), messenger)))
            }
            _ => match connect().await {
                Ok(store) => {
                    info!("✓ MongoDB connected successfully");
                    Ok(rocket.manage(AppState::mongo(store, messenger)))
                }
                Err(e) => {
                    error!("✗ Failed to connect to MongoDB: {}", e);
                    Err(rocket)
                }
            },
        }
    })
}

/// Settings that fall back to something unusable or insecure.
fn config_warnings() -> Vec<String> {
    let mut warnings = Vec::new();
    if !Config::is_whatsapp_enabled() {
        warnings.push("WhatsApp credentials missing; one-time codes cannot be delivered".to_string());
    }
    if !Config::is_otp_pepper_set() {
        warnings.push("otp_pepper not set; one-time codes are hashed with the built-in default".to_string());
    }
    let length = Config::otp_length();
    if !CODE_LENGTHS.contains(&length) {
        warnings.push(format!(
            "otp_length {} outside {}..={}; one-time codes cannot be issued",
            length,
            CODE_LENGTHS.start(),
            CODE_LENGTHS.end()
        ));
    }
    warnings
}

async fn connect() -> Result<MongoStore, StoreError> {
    let uri = Config::mongodb_uri();
    let client = Client::with_uri_str(&uri).await?;

    // Test connection
    client
        .database("admin")
        .run_command(mongodb::bson::doc! {"ping": 1}, None)
        .await?;

    let db: Database = client.database(&Config::mongodb_database());
    let store = MongoStore::new(db);
    store.ensure_indexes().await?;
    Ok(store)
}
