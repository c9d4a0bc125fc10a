use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;

/// Something a company sells by the slot (haircut, consultation, ...).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceOffering {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub name: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
    pub active: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceDto {
    pub name: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub price_cents: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
    pub active: bool,
}

impl From<ServiceOffering> for ServiceResponse {
    fn from(service: ServiceOffering) -> Self {
        ServiceResponse {
            id: service.id.map(|id| id.to_hex()).unwrap_or_default(),
            company_id: service.company_id.to_hex(),
            name: service.name,
            duration_minutes: service.duration_minutes,
            price_cents: service.price_cents,
            active: service.active,
        }
    }
}
