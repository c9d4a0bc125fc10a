use std::sync::Arc;

use crate::services::MessageSender;
use crate::stores::memory::MemoryStore;
use crate::stores::mongo::MongoStore;
use crate::stores::{AppointmentStore, CompanyStore, OneTimeCodeStore, RateLimitStore, UserStore};

/// Everything handlers reach through `&State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub companies: Arc<dyn CompanyStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub codes: Arc<dyn OneTimeCodeStore>,
    pub rate_limits: Arc<dyn RateLimitStore>,
    pub messenger: Arc<dyn MessageSender>,
}

impl AppState {
    pub fn in_memory(store: MemoryStore, messenger: Arc<dyn MessageSender>) -> Self {
        let store = Arc::new(store);
        AppState {
            users: store.clone(),
            companies: store.clone(),
            appointments: store.clone(),
            codes: store.clone(),
            rate_limits: store,
            messenger,
        }
    }

    pub fn mongo(store: MongoStore, messenger: Arc<dyn MessageSender>) -> Self {
        let store = Arc::new(store);
        AppState {
            users: store.clone(),
            companies: store.clone(),
            appointments: store.clone(),
            codes: store.clone(),
            rate_limits: store,
            messenger,
        }
    }
}
