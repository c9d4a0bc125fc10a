use std::collections::HashMap;
use std::sync::Arc;

use mongodb::bson::{oid::ObjectId, DateTime};
use tokio::sync::RwLock;

use super::{
    AppointmentStore, CompanyStore, OneTimeCodeStore, RateLimitStore, StoreError, UserStore,
};
use crate::models::{
    Appointment, AppointmentStatus, BusinessHours, Company, OneTimeCode, ServiceOffering,
    TwoFactorCredential, User,
};

/// HashMap-backed implementation of every store trait.
#[derive(Default, Clone)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<ObjectId, User>>>,
    companies: Arc<RwLock<HashMap<ObjectId, Company>>>,
    services: Arc<RwLock<HashMap<ObjectId, ServiceOffering>>>,
    appointments: Arc<RwLock<HashMap<ObjectId, Appointment>>>,
    codes: Arc<RwLock<HashMap<String, OneTimeCode>>>,
    rate_limits: Arc<RwLock<HashMap<String, (i32, DateTime)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, mut user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("users.email {}", user.email)));
        }
        let id = ObjectId::new();
        user.id = Some(id);
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn set_two_factor(
        &self,
        id: &ObjectId,
        two_factor: &TwoFactorCredential,
    ) -> Result<bool, StoreError> {
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                user.two_factor = two_factor.clone();
                user.updated_at = DateTime::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_login(&self, id: &ObjectId, at: DateTime) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl CompanyStore for MemoryStore {
    async fn insert_company(&self, mut company: Company) -> Result<Company, StoreError> {
        let id = ObjectId::new();
        company.id = Some(id);
        self.companies.write().await.insert(id, company.clone());
        Ok(company)
    }

    async fn find_company(&self, id: &ObjectId) -> Result<Option<Company>, StoreError> {
        Ok(self.companies.read().await.get(id).cloned())
    }

    async fn set_business_hours(
        &self,
        id: &ObjectId,
        hours: &[BusinessHours],
    ) -> Result<bool, StoreError> {
        match self.companies.write().await.get_mut(id) {
            Some(company) => {
                company.business_hours = hours.to_vec();
                company.updated_at = DateTime::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_service(&self, mut service: ServiceOffering) -> Result<ServiceOffering, StoreError> {
        let id = ObjectId::new();
        service.id = Some(id);
        self.services.write().await.insert(id, service.clone());
        Ok(service)
    }

    async fn find_service(&self, id: &ObjectId) -> Result<Option<ServiceOffering>, StoreError> {
        Ok(self.services.read().await.get(id).cloned())
    }

    async fn list_services(&self, company_id: &ObjectId) -> Result<Vec<ServiceOffering>, StoreError> {
        let mut services: Vec<ServiceOffering> = self
            .services
            .read()
            .await
            .values()
            .filter(|s| &s.company_id == company_id)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }
}

#[rocket::async_trait]
impl AppointmentStore for MemoryStore {
    async fn insert_appointment(&self, mut appointment: Appointment) -> Result<Appointment, StoreError> {
        let id = ObjectId::new();
        appointment.id = Some(id);
        self.appointments.write().await.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn find_appointment(&self, id: &ObjectId) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments.read().await.get(id).cloned())
    }

    async fn appointments_between(
        &self,
        company_id: &ObjectId,
        from: DateTime,
        to: DateTime,
        statuses: Option<&[AppointmentStatus]>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut found: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| &a.company_id == company_id)
            .filter(|a| a.start_date_time >= from && a.start_date_time < to)
            .filter(|a| statuses.is_none_or(|s| s.contains(&a.status)))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_date_time);
        Ok(found)
    }

    async fn set_appointment_status(
        &self,
        id: &ObjectId,
        status: AppointmentStatus,
        at: DateTime,
    ) -> Result<bool, StoreError> {
        match self.appointments.write().await.get_mut(id) {
            Some(appointment) => {
                appointment.status = status;
                appointment.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[rocket::async_trait]
impl OneTimeCodeStore for MemoryStore {
    async fn replace_code(&self, code: OneTimeCode) -> Result<(), StoreError> {
        let _ = self.codes.write().await.insert(code.subject.clone(), code);
        Ok(())
    }

    async fn find_code(&self, subject: &str) -> Result<Option<OneTimeCode>, StoreError> {
        Ok(self.codes.read().await.get(subject).cloned())
    }

    async fn increment_attempts(&self, subject: &str) -> Result<(), StoreError> {
        if let Some(code) = self.codes.write().await.get_mut(subject) {
            code.attempts += 1;
        }
        Ok(())
    }

    async fn remove_code(&self, subject: &str) -> Result<(), StoreError> {
        let _ = self.codes.write().await.remove(subject);
        Ok(())
    }
}

#[rocket::async_trait]
impl RateLimitStore for MemoryStore {
    async fn hit(&self, key: &str, window_ms: i64, now: DateTime) -> Result<i32, StoreError> {
        let mut limits = self.rate_limits.write().await;
        let entry = limits
            .entry(key.to_string())
            .or_insert((0, DateTime::from_millis(0)));

        if entry.1 <= now {
            *entry = (1, DateTime::from_millis(now.timestamp_millis() + window_ms));
        } else {
            entry.0 += 1;
        }
        Ok(entry.0)
    }
}
