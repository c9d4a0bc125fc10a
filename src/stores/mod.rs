//! Persistence seams. Route handlers only see these traits; `mongo` backs
//! them in production and `memory` for local runs and tests.

pub mod memory;
pub mod mongo;

use mongodb::bson::{oid::ObjectId, DateTime};
use thiserror::Error;

use crate::models::{
    Appointment, AppointmentStatus, BusinessHours, Company, OneTimeCode, ServiceOffering,
    TwoFactorCredential, User,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("corrupt document: {0}")]
    Corrupt(String),
}

#[rocket::async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the email is taken.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;
    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn set_two_factor(
        &self,
        id: &ObjectId,
        two_factor: &TwoFactorCredential,
    ) -> Result<bool, StoreError>;
    async fn touch_login(&self, id: &ObjectId, at: DateTime) -> Result<(), StoreError>;
}

#[rocket::async_trait]
pub trait CompanyStore: Send + Sync {
    async fn insert_company(&self, company: Company) -> Result<Company, StoreError>;
    async fn find_company(&self, id: &ObjectId) -> Result<Option<Company>, StoreError>;
    async fn set_business_hours(
        &self,
        id: &ObjectId,
        hours: &[BusinessHours],
    ) -> Result<bool, StoreError>;
    async fn insert_service(&self, service: ServiceOffering) -> Result<ServiceOffering, StoreError>;
    async fn find_service(&self, id: &ObjectId) -> Result<Option<ServiceOffering>, StoreError>;
    async fn list_services(&self, company_id: &ObjectId) -> Result<Vec<ServiceOffering>, StoreError>;
}

#[rocket::async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment, StoreError>;
    async fn find_appointment(&self, id: &ObjectId) -> Result<Option<Appointment>, StoreError>;
    /// Appointments starting in `[from, to)`, ordered by start. `statuses`
    /// narrows the result when given.
    async fn appointments_between(
        &self,
        company_id: &ObjectId,
        from: DateTime,
        to: DateTime,
        statuses: Option<&[AppointmentStatus]>,
    ) -> Result<Vec<Appointment>, StoreError>;
    async fn set_appointment_status(
        &self,
        id: &ObjectId,
        status: AppointmentStatus,
        at: DateTime,
    ) -> Result<bool, StoreError>;
}

#[rocket::async_trait]
pub trait OneTimeCodeStore: Send + Sync {
    /// Stores `code`, replacing any pending code for the same subject.
    async fn replace_code(&self, code: OneTimeCode) -> Result<(), StoreError>;
    async fn find_code(&self, subject: &str) -> Result<Option<OneTimeCode>, StoreError>;
    async fn increment_attempts(&self, subject: &str) -> Result<(), StoreError>;
    async fn remove_code(&self, subject: &str) -> Result<(), StoreError>;
}

#[rocket::async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Counts one hit against `key` and returns the count inside the current
    /// window, starting a fresh window of `window_ms` when the last one expired.
    async fn hit(&self, key: &str, window_ms: i64, now: DateTime) -> Result<i32, StoreError>;
}
