use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ScheduleConfig;

use super::capacity::{seats_available, standing_occupancy};
use super::clock::Clock;
use super::domain::{
    is_valid_day_of_week, ActivityKind, ActivityRecord, Enrollment, EnrollmentId, MakeupId,
    NoClassDay, ScheduledMakeup, Slot, SlotId, SlotSpec, Student, StudentId,
};
use super::error::ScheduleError;
use super::occurrences::{is_occurrence, next_occurrences, OccurrenceCutoff};
use super::store::ScheduleStore;

/// Bounds for a bulk cancellation of upcoming occurrences.
pub const MIN_CANCEL_COUNT: u32 = 1;
pub const MAX_CANCEL_COUNT: u32 = 20;

/// What a cancellation request targets: the next N occurrences, or one
/// specific future date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelTarget {
    Count(u32),
    Date(NaiveDate),
}

/// Outcome of a makeup booking. Recovering a class in a different slot is a
/// net-new one-off booking; recovering it in the student's own slot restores
/// the occurrence they had cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MakeupOutcome {
    Booked { makeup: ScheduledMakeup },
    Restored { enrollment_id: EnrollmentId, date: NaiveDate },
}

/// One upcoming date with the seats still open on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OccurrenceSeats {
    pub date: NaiveDate,
    pub seats_available: i64,
}

/// A slot plus its standing seat usage and next meeting dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSummary {
    #[serde(flatten)]
    pub slot: Slot,
    pub seats_occupied: u32,
    pub seats_available: i64,
    pub upcoming: Vec<OccurrenceSeats>,
}

/// A standing enrollment with its next meeting dates, the student's own
/// cancelled dates already excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentView {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub upcoming: Vec<NaiveDate>,
}

/// Everything the student portal shows for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentOverview {
    pub student: Student,
    pub enrollments: Vec<EnrollmentView>,
    pub makeups: Vec<ScheduledMakeup>,
}

/// Partial update for a slot; absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SlotUpdate {
    pub max_capacity: Option<u32>,
    pub active: Option<bool>,
}

/// Filters for the activity feed; results are newest-first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityQuery {
    pub student_id: Option<StudentId>,
    pub kind: Option<ActivityKind>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// The scheduling engine's public facade.
///
/// Every lifecycle method runs its checks and mutations inside one store
/// transaction, so concurrent callers can never jointly exceed a slot's
/// capacity or double-spend a credit.
pub struct ScheduleService<C> {
    store: Arc<ScheduleStore>,
    clock: Arc<C>,
    default_occurrence_count: usize,
}

impl<C> ScheduleService<C>
where
    C: Clock + 'static,
{
    pub fn new(store: Arc<ScheduleStore>, clock: Arc<C>, config: ScheduleConfig) -> Self {
        Self {
            store,
            clock,
            default_occurrence_count: config.default_occurrence_count,
        }
    }

    // --- slot directory ---

    pub fn register_slot(&self, spec: SlotSpec) -> Result<Slot, ScheduleError> {
        if !is_valid_day_of_week(spec.day_of_week) {
            return Err(ScheduleError::invalid_range(
                "day_of_week",
                format!("{} is not in 0-6 (Sunday-first)", spec.day_of_week),
            ));
        }
        if spec.start_time >= spec.end_time {
            return Err(ScheduleError::invalid_range(
                "start_time",
                "start time must be before end time",
            ));
        }
        if spec.max_capacity == 0 {
            return Err(ScheduleError::invalid_range(
                "max_capacity",
                "capacity must be at least 1",
            ));
        }

        let slot = self.store.write(|data| data.insert_slot(spec));
        info!(slot_id = slot.id.0, day_of_week = slot.day_of_week, "slot registered");
        Ok(slot)
    }

    /// Apply a partial update. Shrinking capacity below the standing count is
    /// allowed and leaves the slot oversubscribed; it only blocks new
    /// bookings, it never evicts anyone.
    pub fn update_slot(&self, id: SlotId, update: SlotUpdate) -> Result<Slot, ScheduleError> {
        if update.max_capacity == Some(0) {
            return Err(ScheduleError::invalid_range(
                "max_capacity",
                "capacity must be at least 1",
            ));
        }

        self.store.transaction(|data| {
            let slot = data
                .slot_mut(id)
                .ok_or(ScheduleError::not_found("slot"))?;
            if let Some(capacity) = update.max_capacity {
                slot.max_capacity = capacity;
            }
            if let Some(active) = update.active {
                slot.active = active;
            }
            Ok(slot.clone())
        })
    }

    /// Active slots ordered by weekday and start time, each with its standing
    /// occupancy and next dates (seats counted per date).
    pub fn list_slots(&self) -> Vec<SlotSummary> {
        let now = self.clock.now_local();
        let count = self.default_occurrence_count;
        self.store.read(|data| {
            let mut slots: Vec<Slot> = data.slots().filter(|s| s.active).cloned().collect();
            slots.sort_by_key(|s| (s.day_of_week, s.start_time, s.id));
            slots
                .into_iter()
                .map(|slot| {
                    let (seats_occupied, available) = standing_occupancy(data, &slot);
                    let upcoming = next_occurrences(
                        data,
                        &slot,
                        None,
                        now,
                        count,
                        OccurrenceCutoff::SessionStart,
                    )
                    .into_iter()
                    .map(|date| OccurrenceSeats {
                        date,
                        seats_available: seats_available(data, &slot, date),
                    })
                    .collect();
                    SlotSummary {
                        slot,
                        seats_occupied,
                        seats_available: available,
                        upcoming,
                    }
                })
                .collect()
        })
    }

    // --- student directory ---

    pub fn register_student(&self, name: impl Into<String>) -> Student {
        let name = name.into();
        self.store.write(|data| data.insert_student(name))
    }

    pub fn student_overview(&self, id: StudentId) -> Result<StudentOverview, ScheduleError> {
        let now = self.clock.now_local();
        let count = self.default_occurrence_count;
        self.store.read(|data| {
            let student = data
                .student(id)
                .cloned()
                .ok_or(ScheduleError::not_found("student"))?;
            let enrollments = data
                .active_enrollments_of_student(id)
                .into_iter()
                .map(|enrollment| {
                    let upcoming = data
                        .slot(enrollment.slot_id)
                        .map(|slot| {
                            next_occurrences(
                                data,
                                slot,
                                Some(enrollment.id),
                                now,
                                count,
                                OccurrenceCutoff::SessionStart,
                            )
                        })
                        .unwrap_or_default();
                    EnrollmentView {
                        enrollment: enrollment.clone(),
                        upcoming,
                    }
                })
                .collect();
            let makeups = data
                .makeups_of_student(id)
                .into_iter()
                .cloned()
                .collect();
            Ok(StudentOverview {
                student,
                enrollments,
                makeups,
            })
        })
    }

    // --- calendar exceptions ---

    pub fn add_no_class_day(
        &self,
        date: NaiveDate,
        reason: Option<String>,
    ) -> Result<NoClassDay, ScheduleError> {
        let day = self
            .store
            .transaction(|data| data.add_no_class_day(date, reason))?;
        info!(%date, "no-class day added");
        Ok(day)
    }

    pub fn remove_no_class_day(&self, date: NaiveDate) -> Result<NoClassDay, ScheduleError> {
        self.store.transaction(|data| data.remove_no_class_day(date))
    }

    pub fn list_no_class_days(&self, year: i32, month: u32) -> Result<Vec<NoClassDay>, ScheduleError> {
        let from = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            ScheduleError::invalid_range("month", format!("{year}-{month} is not a calendar month"))
        })?;
        let to = from
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        Ok(self
            .store
            .read(|data| data.no_class_days_in(from, to).into_iter().cloned().collect()))
    }

    // --- occurrence and capacity queries ---

    /// Upcoming dates for a slot, for listing/booking contexts (today counts
    /// until the session starts).
    pub fn list_upcoming_occurrences(
        &self,
        slot_id: SlotId,
        exclude_enrollment: Option<EnrollmentId>,
        count: Option<usize>,
    ) -> Result<Vec<NaiveDate>, ScheduleError> {
        let now = self.clock.now_local();
        let count = count.unwrap_or(self.default_occurrence_count);
        self.store.read(|data| {
            let slot = data
                .slot(slot_id)
                .ok_or(ScheduleError::not_found("slot"))?;
            Ok(next_occurrences(
                data,
                slot,
                exclude_enrollment,
                now,
                count,
                OccurrenceCutoff::SessionStart,
            ))
        })
    }

    pub fn seats_available(&self, slot_id: SlotId, date: NaiveDate) -> Result<i64, ScheduleError> {
        self.store.read(|data| {
            let slot = data
                .slot(slot_id)
                .ok_or(ScheduleError::not_found("slot"))?;
            Ok(seats_available(data, slot, date))
        })
    }

    // --- enrollment lifecycle ---

    pub fn enroll(
        &self,
        student_id: StudentId,
        slot_id: SlotId,
    ) -> Result<Enrollment, ScheduleError> {
        let now = self.clock.now_local();
        let enrollment = self.store.transaction(|data| {
            let slot = data
                .slot(slot_id)
                .ok_or(ScheduleError::not_found("slot"))?;
            if !slot.active {
                return Err(ScheduleError::SlotInactive);
            }
            let max_capacity = slot.max_capacity;
            data.student(student_id)
                .ok_or(ScheduleError::not_found("student"))?;
            if data.active_enrollment_count(slot_id) >= max_capacity {
                return Err(ScheduleError::CapacityExceeded);
            }
            if data.active_enrollment(student_id, slot_id).is_some() {
                return Err(ScheduleError::DuplicateEnrollment);
            }

            let enrollment = data.insert_enrollment(student_id, slot_id, now);
            data.record_activity(ActivityKind::Enrolled, student_id, slot_id, now);
            Ok(enrollment)
        })?;
        info!(
            enrollment_id = enrollment.id.0,
            student_id = student_id.0,
            slot_id = slot_id.0,
            "student enrolled"
        );
        Ok(enrollment)
    }

    /// Cancel specific upcoming occurrences of a standing enrollment, not the
    /// enrollment itself. Each cancelled date frees that seat for the date
    /// and credits the student with one makeup class.
    ///
    /// Returns the dates actually cancelled; a count-based request may
    /// resolve to fewer dates than asked when the search horizon runs out.
    pub fn cancel_upcoming(
        &self,
        enrollment_id: EnrollmentId,
        target: CancelTarget,
    ) -> Result<Vec<NaiveDate>, ScheduleError> {
        let now = self.clock.now_local();
        let dates = self.store.transaction(|data| {
            let enrollment = data
                .enrollment(enrollment_id)
                .cloned()
                .ok_or(ScheduleError::not_found("enrollment"))?;
            if !enrollment.active {
                return Err(ScheduleError::InactiveEnrollment);
            }
            let slot = data
                .slot(enrollment.slot_id)
                .cloned()
                .ok_or(ScheduleError::not_found("slot"))?;

            let dates = match target {
                CancelTarget::Count(count) => {
                    if !(MIN_CANCEL_COUNT..=MAX_CANCEL_COUNT).contains(&count) {
                        return Err(ScheduleError::invalid_range(
                            "count",
                            format!(
                                "must be between {MIN_CANCEL_COUNT} and {MAX_CANCEL_COUNT}, got {count}"
                            ),
                        ));
                    }
                    // The generator already skips this enrollment's cancelled
                    // dates, so every returned date is new.
                    next_occurrences(
                        data,
                        &slot,
                        Some(enrollment.id),
                        now,
                        count as usize,
                        OccurrenceCutoff::SessionEnd,
                    )
                }
                CancelTarget::Date(date) => {
                    let today = now.date_naive();
                    if date < today {
                        return Err(ScheduleError::PastDate(date));
                    }
                    // Same-day cancellations close once the session has ended.
                    if date == today && now.time() >= slot.end_time {
                        return Err(ScheduleError::PastDate(date));
                    }
                    if !is_occurrence(data, &slot, date) {
                        return Err(ScheduleError::invalid_range(
                            "date",
                            format!("slot does not meet on {date}"),
                        ));
                    }
                    if data.has_absence(enrollment.id, date) {
                        return Err(ScheduleError::AlreadyCancelled(date));
                    }
                    vec![date]
                }
            };

            for date in &dates {
                data.add_absence(enrollment.id, *date)?;
            }
            if !dates.is_empty() {
                data.adjust_credit(enrollment.student_id, dates.len() as i64)?;
                for _ in &dates {
                    data.record_activity(
                        ActivityKind::Cancelled,
                        enrollment.student_id,
                        enrollment.slot_id,
                        now,
                    );
                }
            }
            Ok(dates)
        })?;
        info!(
            enrollment_id = enrollment_id.0,
            cancelled = dates.len(),
            "upcoming occurrences cancelled"
        );
        Ok(dates)
    }

    /// Terminate the standing booking entirely. The enrollment record stays
    /// (inactive) for history; the student keeps one recoverable credit for
    /// the disruption.
    pub fn cancel_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, ScheduleError> {
        let now = self.clock.now_local();
        let enrollment = self.store.transaction(|data| {
            let enrollment = data
                .enrollment(enrollment_id)
                .cloned()
                .ok_or(ScheduleError::not_found("enrollment"))?;
            if !enrollment.active {
                return Err(ScheduleError::InactiveEnrollment);
            }
            data.student(enrollment.student_id)
                .ok_or(ScheduleError::not_found("student"))?;

            let record = data
                .enrollment_mut(enrollment_id)
                .ok_or(ScheduleError::not_found("enrollment"))?;
            record.active = false;
            let updated = record.clone();
            data.adjust_credit(enrollment.student_id, 1)?;
            data.record_activity(
                ActivityKind::Cancelled,
                enrollment.student_id,
                enrollment.slot_id,
                now,
            );
            Ok(updated)
        })?;
        info!(enrollment_id = enrollment_id.0, "standing enrollment cancelled");
        Ok(enrollment)
    }

    // --- makeup lifecycle ---

    /// Spend one credit to attend `slot` on `date`.
    ///
    /// Booking into a slot the student has no standing enrollment in creates
    /// a one-off [`ScheduledMakeup`]; booking back into their own slot on a
    /// date they had cancelled removes the absence instead, restoring the
    /// cancelled occurrence without double-counting the seat.
    pub fn book_makeup(
        &self,
        student_id: StudentId,
        slot_id: SlotId,
        date: NaiveDate,
    ) -> Result<MakeupOutcome, ScheduleError> {
        let now = self.clock.now_local();
        let outcome = self.store.transaction(|data| {
            let student = data
                .student(student_id)
                .cloned()
                .ok_or(ScheduleError::not_found("student"))?;
            let slot = data
                .slot(slot_id)
                .cloned()
                .ok_or(ScheduleError::not_found("slot"))?;
            if student.credit_balance == 0 {
                return Err(ScheduleError::NoCredit);
            }
            if !slot.active {
                return Err(ScheduleError::SlotInactive);
            }

            let today = now.date_naive();
            if date < today {
                return Err(ScheduleError::PastDate(date));
            }
            // A session is joinable until it starts.
            if date == today && now.time() >= slot.start_time {
                return Err(ScheduleError::PastDate(date));
            }
            if !is_occurrence(data, &slot, date) {
                return Err(ScheduleError::invalid_range(
                    "date",
                    format!("slot does not meet on {date}"),
                ));
            }
            if seats_available(data, &slot, date) <= 0 {
                return Err(ScheduleError::CapacityExceeded);
            }

            match data.active_enrollment(student_id, slot_id).map(|e| e.id) {
                // The student's own slot: restore the cancelled occurrence.
                Some(enrollment_id) => {
                    if !data.has_absence(enrollment_id, date) {
                        return Err(ScheduleError::AlreadyEnrolled);
                    }
                    data.remove_absence(enrollment_id, date)?;
                    data.adjust_credit(student_id, -1)?;
                    data.record_activity(ActivityKind::MakeupBooked, student_id, slot_id, now);
                    Ok(MakeupOutcome::Restored {
                        enrollment_id,
                        date,
                    })
                }
                // A different slot: net-new one-off booking.
                None => {
                    if data.has_makeup(student_id, slot_id, date) {
                        return Err(ScheduleError::AlreadyBooked);
                    }
                    let makeup = data.insert_makeup(student_id, slot_id, date, now)?;
                    data.adjust_credit(student_id, -1)?;
                    data.record_activity(ActivityKind::MakeupBooked, student_id, slot_id, now);
                    Ok(MakeupOutcome::Booked { makeup })
                }
            }
        })?;
        info!(student_id = student_id.0, slot_id = slot_id.0, %date, "makeup booked");
        Ok(outcome)
    }

    /// Cancel a makeup booking, returning the credit it consumed. No notice
    /// window applies.
    pub fn cancel_makeup(&self, makeup_id: MakeupId) -> Result<ScheduledMakeup, ScheduleError> {
        let makeup = self.store.transaction(|data| {
            let makeup = data
                .makeup(makeup_id)
                .cloned()
                .ok_or(ScheduleError::not_found("makeup booking"))?;
            data.student(makeup.student_id)
                .ok_or(ScheduleError::not_found("student"))?;
            data.remove_makeup(makeup_id)?;
            data.adjust_credit(makeup.student_id, 1)?;
            Ok(makeup)
        })?;
        info!(makeup_id = makeup.id.0, "makeup cancelled");
        Ok(makeup)
    }

    // --- activity feed ---

    pub fn list_activity(&self, query: ActivityQuery) -> Vec<ActivityRecord> {
        let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
        self.store.read(|data| {
            data.activity(query.student_id, query.kind, query.from, query.to, limit)
        })
    }
}
