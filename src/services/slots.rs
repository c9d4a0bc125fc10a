//! Booked-slot arithmetic on a fixed 30-minute grid.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use mongodb::bson::oid::ObjectId;

use crate::models::{Appointment, AppointmentStatus};
use crate::stores::{AppointmentStore, StoreError};
use crate::utils::{to_bson, to_naive};

pub const SLOT_MINUTES: i64 = 30;

pub type SlotsByDate = BTreeMap<NaiveDate, BTreeSet<NaiveTime>>;

pub struct SlotService;

impl SlotService {
    /// `[first day 00:00, first day of next month 00:00)`; `None` for an
    /// invalid month.
    pub fn month_range(year: i32, month: u32) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some((first.and_time(NaiveTime::MIN), next.and_time(NaiveTime::MIN)))
    }

    pub fn day_range(date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let next = date.succ_opt()?;
        Some((date.and_time(NaiveTime::MIN), next.and_time(NaiveTime::MIN)))
    }

    /// `ceil(duration / 30)`, zero for non-positive durations.
    pub fn slot_count(duration_minutes: i64) -> i64 {
        if duration_minutes <= 0 {
            return 0;
        }
        (duration_minutes + SLOT_MINUTES - 1) / SLOT_MINUTES
    }

    pub fn floor_to_slot(dt: NaiveDateTime) -> NaiveDateTime {
        let minute = dt.minute() as i64 - dt.minute() as i64 % SLOT_MINUTES;
        dt.date()
            .and_hms_opt(dt.hour(), minute as u32, 0)
            .unwrap_or(dt)
    }

    /// Slot starts intersecting `[start, start + duration)`.
    pub fn occupied(start: NaiveDateTime, duration_minutes: i64) -> Vec<NaiveDateTime> {
        if duration_minutes <= 0 {
            return Vec::new();
        }
        let end = start + Duration::minutes(duration_minutes);
        let step = Duration::minutes(SLOT_MINUTES);

        let mut slots = Vec::new();
        let mut cursor = Self::floor_to_slot(start);
        while cursor < end {
            slots.push(cursor);
            cursor += step;
        }
        slots
    }

    /// Union of the slots covered by every active appointment, per date.
    pub fn aggregate<'a>(appointments: impl IntoIterator<Item = &'a Appointment>) -> SlotsByDate {
        let mut by_date = SlotsByDate::new();
        for appointment in appointments {
            if !appointment.status.is_active() {
                continue;
            }
            let start = to_naive(appointment.start_date_time);
            for slot in Self::occupied(start, appointment.duration_minutes) {
                by_date.entry(slot.date()).or_default().insert(slot.time());
            }
        }
        by_date
    }

    pub fn label(time: NaiveTime) -> String {
        time.format("%H:%M").to_string()
    }

    /// `{ "2025-03-10": ["14:00", "14:30"] }`
    pub fn labels(slots: &SlotsByDate) -> BTreeMap<String, Vec<String>> {
        slots
            .iter()
            .map(|(date, times)| {
                (
                    date.format("%Y-%m-%d").to_string(),
                    times.iter().map(|t| Self::label(*t)).collect(),
                )
            })
            .collect()
    }

    /// Active appointments starting inside `[from, to)`, expanded into slots.
    pub async fn booked_between(
        store: &dyn AppointmentStore,
        company_id: &ObjectId,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<SlotsByDate, StoreError> {
        let appointments = store
            .appointments_between(
                company_id,
                to_bson(from),
                to_bson(to),
                Some(&AppointmentStatus::ACTIVE[..]),
            )
            .await?;
        Ok(Self::aggregate(&appointments))
    }

    /// Only dates inside the month are kept; spill-over from the previous
    /// month's last evening is included, spill-over into the next is not.
    pub async fn month_slots(
        store: &dyn AppointmentStore,
        company_id: &ObjectId,
        year: i32,
        month: u32,
    ) -> Result<Option<SlotsByDate>, StoreError> {
        let Some((from, to)) = Self::month_range(year, month) else {
            return Ok(None);
        };
        let mut booked = Self::booked_between(store, company_id, from - Duration::days(1), to).await?;
        booked.retain(|date, _| *date >= from.date() && *date < to.date());
        Ok(Some(booked))
    }

    /// Slots booked on `date`, including the tail of an appointment that
    /// started the evening before.
    pub async fn day_slots(
        store: &dyn AppointmentStore,
        company_id: &ObjectId,
        date: NaiveDate,
    ) -> Result<BTreeSet<NaiveTime>, StoreError> {
        let Some((from, to)) = Self::day_range(date) else {
            return Ok(BTreeSet::new());
        };
        let booked = Self::booked_between(store, company_id, from - Duration::days(1), to).await?;
        Ok(booked.get(&date).cloned().unwrap_or_default())
    }

    pub fn is_month(year: i32, month: u32) -> bool {
        (1970..=9999).contains(&year) && (1..=12).contains(&month)
    }
}
