use std::time::Duration;

use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};

use super::{
    AppointmentStore, CompanyStore, OneTimeCodeStore, RateLimitStore, StoreError, UserStore,
};
use crate::models::{
    Appointment, AppointmentStatus, BusinessHours, Company, OneTimeCode, ServiceOffering,
    TwoFactorCredential, User,
};

const USERS: &str = "users";
const COMPANIES: &str = "companies";
const SERVICES: &str = "services";
const APPOINTMENTS: &str = "appointments";
const ONE_TIME_CODES: &str = "one_time_codes";
const RATE_LIMITS: &str = "rate_limits";

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        MongoStore { db }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn companies(&self) -> Collection<Company> {
        self.db.collection(COMPANIES)
    }

    fn services(&self) -> Collection<ServiceOffering> {
        self.db.collection(SERVICES)
    }

    fn appointments(&self) -> Collection<Appointment> {
        self.db.collection(APPOINTMENTS)
    }

    fn codes(&self) -> Collection<OneTimeCode> {
        self.db.collection(ONE_TIME_CODES)
    }

    fn rate_limits(&self) -> Collection<Document> {
        self.db.collection(RATE_LIMITS)
    }

    /// Unique keys plus TTL cleanup for expired codes and rate-limit windows.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = || IndexOptions::builder().unique(true).build();
        let expire_now = || {
            IndexOptions::builder()
                .expire_after(Duration::from_secs(0))
                .build()
        };

        self.users()
            .create_index(
                IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build(),
                None,
            )
            .await?;
        self.appointments()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "company_id": 1, "start_date_time": 1 })
                    .build(),
                None,
            )
            .await?;
        self.services()
            .create_index(IndexModel::builder().keys(doc! { "company_id": 1 }).build(), None)
            .await?;
        self.codes()
            .create_index(
                IndexModel::builder().keys(doc! { "subject": 1 }).options(unique()).build(),
                None,
            )
            .await?;
        self.codes()
            .create_index(
                IndexModel::builder().keys(doc! { "expires_at": 1 }).options(expire_now()).build(),
                None,
            )
            .await?;
        self.rate_limits()
            .create_index(
                IndexModel::builder().keys(doc! { "key": 1 }).options(unique()).build(),
                None,
            )
            .await?;
        self.rate_limits()
            .create_index(
                IndexModel::builder().keys(doc! { "expires_at": 1 }).options(expire_now()).build(),
                None,
            )
            .await?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

fn inserted_id(id: mongodb::bson::Bson, collection: &str) -> Result<ObjectId, StoreError> {
    id.as_object_id()
        .ok_or_else(|| StoreError::Corrupt(format!("{}: inserted id is not an ObjectId", collection)))
}

fn bson_value<T: serde::Serialize>(value: &T) -> Result<mongodb::bson::Bson, StoreError> {
    to_bson(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

#[rocket::async_trait]
impl UserStore for MongoStore {
    async fn insert_user(&self, mut user: User) -> Result<User, StoreError> {
        let res = self.users().insert_one(&user, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate(format!("users.email {}", user.email))
            } else {
                StoreError::Database(e)
            }
        })?;
        user.id = Some(inserted_id(res.inserted_id, USERS)?);
        Ok(user)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn set_two_factor(
        &self,
        id: &ObjectId,
        two_factor: &TwoFactorCredential,
    ) -> Result<bool, StoreError> {
        let result = self
            .users()
            .update_one(
                doc! { "_id": *id },
                doc! {
                    "$set": {
                        "two_factor": bson_value(two_factor)?,
                        "updated_at": DateTime::now()
                    }
                },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn touch_login(&self, id: &ObjectId, at: DateTime) -> Result<(), StoreError> {
        self.users()
            .update_one(
                doc! { "_id": *id },
                doc! { "$set": { "last_login_at": at } },
                None,
            )
            .await?;
        Ok(())
    }
}

#[rocket::async_trait]
impl CompanyStore for MongoStore {
    async fn insert_company(&self, mut company: Company) -> Result<Company, StoreError> {
        let res = self.companies().insert_one(&company, None).await?;
        company.id = Some(inserted_id(res.inserted_id, COMPANIES)?);
        Ok(company)
    }

    async fn find_company(&self, id: &ObjectId) -> Result<Option<Company>, StoreError> {
        Ok(self.companies().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn set_business_hours(
        &self,
        id: &ObjectId,
        hours: &[BusinessHours],
    ) -> Result<bool, StoreError> {
        let result = self
            .companies()
            .update_one(
                doc! { "_id": *id },
                doc! {
                    "$set": {
                        "business_hours": bson_value(&hours)?,
                        "updated_at": DateTime::now()
                    }
                },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn insert_service(&self, mut service: ServiceOffering) -> Result<ServiceOffering, StoreError> {
        let res = self.services().insert_one(&service, None).await?;
        service.id = Some(inserted_id(res.inserted_id, SERVICES)?);
        Ok(service)
    }

    async fn find_service(&self, id: &ObjectId) -> Result<Option<ServiceOffering>, StoreError> {
        Ok(self.services().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn list_services(&self, company_id: &ObjectId) -> Result<Vec<ServiceOffering>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let mut cursor = self
            .services()
            .find(doc! { "company_id": *company_id }, options)
            .await?;

        let mut services = Vec::new();
        while cursor.advance().await? {
            services.push(cursor.deserialize_current()?);
        }
        Ok(services)
    }
}

#[rocket::async_trait]
impl AppointmentStore for MongoStore {
    async fn insert_appointment(&self, mut appointment: Appointment) -> Result<Appointment, StoreError> {
        let res = self.appointments().insert_one(&appointment, None).await?;
        appointment.id = Some(inserted_id(res.inserted_id, APPOINTMENTS)?);
        Ok(appointment)
    }

    async fn find_appointment(&self, id: &ObjectId) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn appointments_between(
        &self,
        company_id: &ObjectId,
        from: DateTime,
        to: DateTime,
        statuses: Option<&[AppointmentStatus]>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut filter = doc! {
            "company_id": *company_id,
            "start_date_time": { "$gte": from, "$lt": to },
        };
        if let Some(statuses) = statuses {
            let names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
            filter.insert("status", doc! { "$in": names });
        }

        let options = FindOptions::builder()
            .sort(doc! { "start_date_time": 1 })
            .build();
        let mut cursor = self.appointments().find(filter, options).await?;

        let mut appointments = Vec::new();
        while cursor.advance().await? {
            appointments.push(cursor.deserialize_current()?);
        }
        Ok(appointments)
    }

    async fn set_appointment_status(
        &self,
        id: &ObjectId,
        status: AppointmentStatus,
        at: DateTime,
    ) -> Result<bool, StoreError> {
        let result = self
            .appointments()
            .update_one(
                doc! { "_id": *id },
                doc! { "$set": { "status": status.as_str(), "updated_at": at } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[rocket::async_trait]
impl OneTimeCodeStore for MongoStore {
    async fn replace_code(&self, code: OneTimeCode) -> Result<(), StoreError> {
        let options = mongodb::options::ReplaceOptions::builder().upsert(true).build();
        self.codes()
            .replace_one(doc! { "subject": &code.subject }, &code, options)
            .await?;
        Ok(())
    }

    async fn find_code(&self, subject: &str) -> Result<Option<OneTimeCode>, StoreError> {
        Ok(self.codes().find_one(doc! { "subject": subject }, None).await?)
    }

    async fn increment_attempts(&self, subject: &str) -> Result<(), StoreError> {
        self.codes()
            .update_one(
                doc! { "subject": subject },
                doc! { "$inc": { "attempts": 1 } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn remove_code(&self, subject: &str) -> Result<(), StoreError> {
        self.codes()
            .delete_one(doc! { "subject": subject }, None)
            .await?;
        Ok(())
    }
}

/// One pipeline update: bump the count inside a live window, otherwise open a
/// new window at one. Every `$cond` reads the document as it was before.
fn hit_pipeline(now: DateTime, window_expires: DateTime) -> Vec<Document> {
    let live = doc! { "$gt": ["$expires_at", now] };
    vec![doc! {
        "$set": {
            "count": { "$cond": [live.clone(), { "$add": ["$count", 1] }, 1] },
            "expires_at": { "$cond": [live, "$expires_at", window_expires] },
        }
    }]
}

#[rocket::async_trait]
impl RateLimitStore for MongoStore {
    async fn hit(&self, key: &str, window_ms: i64, now: DateTime) -> Result<i32, StoreError> {
        let window_expires = DateTime::from_millis(now.timestamp_millis() + window_ms);
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .rate_limits()
            .find_one_and_update(doc! { "key": key }, hit_pipeline(now, window_expires), options)
            .await?;

        Ok(updated.and_then(|d| d.get_i32("count").ok()).unwrap_or(1))
    }
}
