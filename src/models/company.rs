use chrono::Weekday;
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        DayOfWeek::ALL[day.num_days_from_monday() as usize]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct BusinessHours {
    pub day: DayOfWeek,
    /// `HH:MM`
    pub open: String,
    /// `HH:MM`, exclusive.
    pub close: String,
    #[serde(default)]
    pub closed: bool,
}

impl BusinessHours {
    /// Monday to Friday 09:00-18:00, weekend closed.
    pub fn default_week() -> Vec<BusinessHours> {
        DayOfWeek::ALL
            .iter()
            .map(|&day| BusinessHours {
                day,
                open: "09:00".to_string(),
                close: "18:00".to_string(),
                closed: matches!(day, DayOfWeek::Saturday | DayOfWeek::Sunday),
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Company {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub business_hours: Vec<BusinessHours>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Company {
    pub fn hours_for(&self, day: DayOfWeek) -> Option<&BusinessHours> {
        self.business_hours.iter().find(|h| h.day == day)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyDto {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub business_hours: Option<Vec<BusinessHours>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateBusinessHoursDto {
    pub hours: Vec<BusinessHours>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub business_hours: Vec<BusinessHours>,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        CompanyResponse {
            id: company.id.map(|id| id.to_hex()).unwrap_or_default(),
            owner_id: company.owner_id.to_hex(),
            name: company.name,
            phone: company.phone,
            address: company.address,
            business_hours: company.business_hours,
        }
    }
}
