use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for weekly recurring slots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SlotId(pub u64);

/// Identifier wrapper for students known to the scheduling engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StudentId(pub u64);

/// Identifier wrapper for standing enrollments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EnrollmentId(pub u64);

/// Identifier wrapper for one-off makeup bookings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MakeupId(pub u64);

/// A weekly recurring class timeslot.
///
/// `day_of_week` is 0–6 with Sunday first, matching the wire encoding used by
/// the admin UI. Slots are soft-deleted through `active`; enrollments keep
/// referencing deactivated slots for history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_capacity: u32,
    pub active: bool,
}

/// Parameters for registering a new slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_capacity: u32,
}

/// The slice of the student directory the engine owns: identity plus the
/// makeup credit balance. The balance is only ever mutated by the
/// enrollment/makeup lifecycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub credit_balance: u32,
}

/// A standing weekly booking of one student into one slot.
///
/// Cancellation deactivates the record; it is never deleted, and re-enrolling
/// produces a fresh record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub slot_id: SlotId,
    pub enrolled_at: DateTime<FixedOffset>,
    pub active: bool,
}

/// A calendar date on which no slot meets (holiday, closure), with an
/// optional human-readable reason. Unique per date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoClassDay {
    pub date: NaiveDate,
    pub reason: Option<String>,
}

/// Marks one occurrence of a standing enrollment as skipped, freeing the seat
/// for that date and crediting the student with one makeup class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAbsence {
    pub enrollment_id: EnrollmentId,
    pub date: NaiveDate,
}

/// A one-off attendance booked against a slot on a specific date, consuming
/// one makeup credit. Not a standing enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMakeup {
    pub id: MakeupId,
    pub student_id: StudentId,
    pub slot_id: SlotId,
    pub date: NaiveDate,
    pub booked_at: DateTime<FixedOffset>,
}

/// Lifecycle events recorded for audit and UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Enrolled,
    Cancelled,
    MakeupBooked,
}

impl ActivityKind {
    pub const fn label(self) -> &'static str {
        match self {
            ActivityKind::Enrolled => "enrolled",
            ActivityKind::Cancelled => "cancelled",
            ActivityKind::MakeupBooked => "makeup_booked",
        }
    }
}

/// Append-only audit entry; written once by the lifecycles, read many times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: u64,
    pub kind: ActivityKind,
    pub student_id: StudentId,
    pub slot_id: SlotId,
    pub timestamp: DateTime<FixedOffset>,
}

/// Day-of-week of a calendar date in the 0–6 Sunday-first encoding.
pub fn day_of_week_of(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn is_valid_day_of_week(day: u8) -> bool {
    day <= 6
}

pub fn day_name(day: u8) -> &'static str {
    match day {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Invalid",
    }
}
