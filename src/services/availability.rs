use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use super::slots::{SlotService, SLOT_MINUTES};
use crate::models::{BusinessHours, Company, DayOfWeek};
use crate::utils::parse_clock;

pub struct AvailabilityService;

impl AvailabilityService {
    /// Grid slots fully inside the opening hours of `hours`.
    pub fn open_slots(hours: &BusinessHours) -> Vec<NaiveTime> {
        if hours.closed {
            return Vec::new();
        }
        let (Some(open), Some(close)) = (parse_clock(&hours.open), parse_clock(&hours.close)) else {
            return Vec::new();
        };

        let step = Duration::minutes(SLOT_MINUTES);
        let day = NaiveDate::default();
        let close = day.and_time(close);
        let mut cursor = day.and_time(open);
        // opening hours off the grid start at the next boundary
        if SlotService::floor_to_slot(cursor) != cursor {
            cursor = SlotService::floor_to_slot(cursor) + step;
        }

        let mut slots = Vec::new();
        while cursor + step <= close {
            slots.push(cursor.time());
            cursor += step;
        }
        slots
    }

    pub fn open_slots_on(company: &Company, date: NaiveDate) -> Vec<NaiveTime> {
        company
            .hours_for(DayOfWeek::from(date.weekday()))
            .map(Self::open_slots)
            .unwrap_or_default()
    }

    /// Starts from which `ceil(duration / 30)` consecutive slots are open and
    /// unbooked.
    pub fn available_starts(
        open: &[NaiveTime],
        booked: &BTreeSet<NaiveTime>,
        duration_minutes: i64,
        date: NaiveDate,
    ) -> Vec<NaiveTime> {
        let needed = SlotService::slot_count(duration_minutes).max(1) as usize;
        let free: BTreeSet<NaiveTime> = open
            .iter()
            .filter(|t| !booked.contains(t))
            .copied()
            .collect();
        let step = Duration::minutes(SLOT_MINUTES);

        open.iter()
            .copied()
            .filter(|start| {
                (0..needed).all(|i| {
                    let slot = date.and_time(*start) + step * i as i32;
                    slot.date() == date && free.contains(&slot.time())
                })
            })
            .collect()
    }

    pub fn is_bookable(
        company: &Company,
        booked: &BTreeSet<NaiveTime>,
        start: NaiveDateTime,
        duration_minutes: i64,
    ) -> bool {
        if SlotService::floor_to_slot(start) != start {
            return false;
        }
        let date = start.date();
        let open = Self::open_slots_on(company, date);
        Self::available_starts(&open, booked, duration_minutes, date).contains(&start.time())
    }
}
