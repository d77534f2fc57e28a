use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::config::ScheduleConfig;
use crate::scheduling::clock::FixedClock;
use crate::scheduling::domain::{Slot, SlotSpec, Student};
use crate::scheduling::service::ScheduleService;
use crate::scheduling::store::ScheduleStore;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

/// Reference instant for most tests: Tuesday 2025-06-24, 08:00 local.
pub(super) fn tuesday_morning() -> FixedClock {
    FixedClock::at(date(2025, 6, 24), time(8, 0))
}

/// The Monday after the reference instant.
pub(super) fn next_monday() -> NaiveDate {
    date(2025, 6, 30)
}

/// The Tuesday after the reference instant (today's session has not started).
pub(super) fn next_tuesday() -> NaiveDate {
    date(2025, 6, 24)
}

pub(super) fn service_at(clock: FixedClock) -> Arc<ScheduleService<FixedClock>> {
    Arc::new(ScheduleService::new(
        Arc::new(ScheduleStore::new()),
        Arc::new(clock),
        ScheduleConfig {
            default_occurrence_count: 4,
        },
    ))
}

pub(super) fn service() -> Arc<ScheduleService<FixedClock>> {
    service_at(tuesday_morning())
}

/// Monday 09:00-10:00 with the given capacity.
pub(super) fn monday_slot(service: &ScheduleService<FixedClock>, capacity: u32) -> Slot {
    service
        .register_slot(SlotSpec {
            day_of_week: 1,
            start_time: time(9, 0),
            end_time: time(10, 0),
            max_capacity: capacity,
        })
        .expect("slot registers")
}

/// Tuesday 18:00-19:00 with the given capacity.
pub(super) fn tuesday_slot(service: &ScheduleService<FixedClock>, capacity: u32) -> Slot {
    service
        .register_slot(SlotSpec {
            day_of_week: 2,
            start_time: time(18, 0),
            end_time: time(19, 0),
            max_capacity: capacity,
        })
        .expect("slot registers")
}

pub(super) fn student(service: &ScheduleService<FixedClock>, name: &str) -> Student {
    service.register_student(name)
}

pub(super) fn balance_of(service: &ScheduleService<FixedClock>, student: &Student) -> u32 {
    service
        .student_overview(student.id)
        .expect("student exists")
        .student
        .credit_balance
}

/// Enroll and cancel one upcoming date so makeup tests start from a funded
/// credit balance.
pub(super) fn grant_credit(
    service: &ScheduleService<FixedClock>,
    student: &Student,
    slot: &Slot,
    cancel_date: NaiveDate,
) {
    let enrollment = service
        .enroll(student.id, slot.id)
        .expect("enrollment succeeds");
    service
        .cancel_upcoming(
            enrollment.id,
            crate::scheduling::service::CancelTarget::Date(cancel_date),
        )
        .expect("cancellation succeeds");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
