use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, NaiveDate};

use super::domain::{
    ActivityKind, ActivityRecord, Enrollment, EnrollmentId, MakeupId, NoClassDay,
    ScheduledAbsence, ScheduledMakeup, Slot, SlotId, SlotSpec, Student, StudentId,
};
use super::error::ScheduleError;

/// In-process store for the whole scheduling data set.
///
/// One mutex guards everything, so each lifecycle operation runs as a single
/// serializable transaction: the capacity check and the mutations it guards
/// can never interleave with another writer.
#[derive(Debug, Default)]
pub struct ScheduleStore {
    data: Mutex<ScheduleData>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` atomically against the data set.
    ///
    /// The lock provides isolation, not rollback: operations must finish every
    /// fallible check before their first mutation.
    pub fn transaction<T>(
        &self,
        op: impl FnOnce(&mut ScheduleData) -> Result<T, ScheduleError>,
    ) -> Result<T, ScheduleError> {
        let mut data = self.data.lock().expect("schedule store mutex poisoned");
        op(&mut data)
    }

    /// Run an infallible write; same isolation as [`Self::transaction`]
    /// without a `Result` to thread through.
    pub fn write<T>(&self, op: impl FnOnce(&mut ScheduleData) -> T) -> T {
        let mut data = self.data.lock().expect("schedule store mutex poisoned");
        op(&mut data)
    }

    /// Run a read-only query against a consistent snapshot.
    pub fn read<T>(&self, op: impl FnOnce(&ScheduleData) -> T) -> T {
        let data = self.data.lock().expect("schedule store mutex poisoned");
        op(&data)
    }
}

/// The durable record types from the data model, keyed so that every
/// uniqueness invariant is enforced structurally rather than by application
/// checks alone: one no-class day per date, one absence per
/// (enrollment, date), one makeup per (student, slot, date).
#[derive(Debug, Default)]
pub struct ScheduleData {
    slots: HashMap<SlotId, Slot>,
    students: HashMap<StudentId, Student>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    no_class_days: BTreeMap<NaiveDate, NoClassDay>,
    absences: BTreeSet<(EnrollmentId, NaiveDate)>,
    makeups: BTreeMap<MakeupId, ScheduledMakeup>,
    makeup_index: BTreeSet<(StudentId, SlotId, NaiveDate)>,
    activity: Vec<ActivityRecord>,
    next_id: u64,
}

impl ScheduleData {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // --- slot directory ---

    pub fn insert_slot(&mut self, spec: SlotSpec) -> Slot {
        let slot = Slot {
            id: SlotId(self.next_id()),
            day_of_week: spec.day_of_week,
            start_time: spec.start_time,
            end_time: spec.end_time,
            max_capacity: spec.max_capacity,
            active: true,
        };
        self.slots.insert(slot.id, slot.clone());
        slot
    }

    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    pub fn slot_mut(&mut self, id: SlotId) -> Option<&mut Slot> {
        self.slots.get_mut(&id)
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    // --- student directory ---

    pub fn insert_student(&mut self, name: String) -> Student {
        let student = Student {
            id: StudentId(self.next_id()),
            name,
            credit_balance: 0,
        };
        self.students.insert(student.id, student.clone());
        student
    }

    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.get(&id)
    }

    /// Move the student's credit balance by `delta` classes. The balance never
    /// goes below zero; lifecycles check `NoCredit` before spending.
    pub fn adjust_credit(&mut self, id: StudentId, delta: i64) -> Result<u32, ScheduleError> {
        let student = self
            .students
            .get_mut(&id)
            .ok_or(ScheduleError::not_found("student"))?;
        let balance = i64::from(student.credit_balance) + delta;
        if balance < 0 {
            return Err(ScheduleError::NoCredit);
        }
        student.credit_balance = balance as u32;
        Ok(student.credit_balance)
    }

    // --- enrollments ---

    pub fn insert_enrollment(
        &mut self,
        student_id: StudentId,
        slot_id: SlotId,
        enrolled_at: DateTime<FixedOffset>,
    ) -> Enrollment {
        let enrollment = Enrollment {
            id: EnrollmentId(self.next_id()),
            student_id,
            slot_id,
            enrolled_at,
            active: true,
        };
        self.enrollments.insert(enrollment.id, enrollment.clone());
        enrollment
    }

    pub fn enrollment(&self, id: EnrollmentId) -> Option<&Enrollment> {
        self.enrollments.get(&id)
    }

    pub fn enrollment_mut(&mut self, id: EnrollmentId) -> Option<&mut Enrollment> {
        self.enrollments.get_mut(&id)
    }

    pub fn active_enrollment(&self, student_id: StudentId, slot_id: SlotId) -> Option<&Enrollment> {
        self.enrollments
            .values()
            .find(|e| e.active && e.student_id == student_id && e.slot_id == slot_id)
    }

    pub fn active_enrollments_of_student(&self, student_id: StudentId) -> Vec<&Enrollment> {
        let mut found: Vec<&Enrollment> = self
            .enrollments
            .values()
            .filter(|e| e.active && e.student_id == student_id)
            .collect();
        found.sort_by_key(|e| e.id);
        found
    }

    pub fn active_enrollment_count(&self, slot_id: SlotId) -> u32 {
        self.enrollments
            .values()
            .filter(|e| e.active && e.slot_id == slot_id)
            .count() as u32
    }

    // --- calendar exceptions ---

    pub fn add_no_class_day(
        &mut self,
        date: NaiveDate,
        reason: Option<String>,
    ) -> Result<NoClassDay, ScheduleError> {
        if self.no_class_days.contains_key(&date) {
            return Err(ScheduleError::AlreadyCancelled(date));
        }
        let day = NoClassDay { date, reason };
        self.no_class_days.insert(date, day.clone());
        Ok(day)
    }

    pub fn remove_no_class_day(&mut self, date: NaiveDate) -> Result<NoClassDay, ScheduleError> {
        self.no_class_days
            .remove(&date)
            .ok_or(ScheduleError::not_found("no-class day"))
    }

    pub fn is_no_class_day(&self, date: NaiveDate) -> bool {
        self.no_class_days.contains_key(&date)
    }

    pub fn no_class_days_in(&self, from: NaiveDate, to: NaiveDate) -> Vec<&NoClassDay> {
        self.no_class_days.range(from..to).map(|(_, d)| d).collect()
    }

    pub fn add_absence(
        &mut self,
        enrollment_id: EnrollmentId,
        date: NaiveDate,
    ) -> Result<ScheduledAbsence, ScheduleError> {
        if !self.absences.insert((enrollment_id, date)) {
            return Err(ScheduleError::AlreadyCancelled(date));
        }
        Ok(ScheduledAbsence {
            enrollment_id,
            date,
        })
    }

    pub fn remove_absence(
        &mut self,
        enrollment_id: EnrollmentId,
        date: NaiveDate,
    ) -> Result<(), ScheduleError> {
        if !self.absences.remove(&(enrollment_id, date)) {
            return Err(ScheduleError::not_found("scheduled absence"));
        }
        Ok(())
    }

    pub fn has_absence(&self, enrollment_id: EnrollmentId, date: NaiveDate) -> bool {
        self.absences.contains(&(enrollment_id, date))
    }

    /// Absences freeing a seat in `slot_id` on `date`: one per active
    /// enrollment of that slot with a scheduled absence that day.
    pub fn absence_count_on(&self, slot_id: SlotId, date: NaiveDate) -> u32 {
        self.absences
            .iter()
            .filter(|(enrollment_id, absent_on)| {
                *absent_on == date
                    && self
                        .enrollments
                        .get(enrollment_id)
                        .is_some_and(|e| e.active && e.slot_id == slot_id)
            })
            .count() as u32
    }

    // --- makeups ---

    pub fn insert_makeup(
        &mut self,
        student_id: StudentId,
        slot_id: SlotId,
        date: NaiveDate,
        booked_at: DateTime<FixedOffset>,
    ) -> Result<ScheduledMakeup, ScheduleError> {
        if !self.makeup_index.insert((student_id, slot_id, date)) {
            return Err(ScheduleError::AlreadyBooked);
        }
        let makeup = ScheduledMakeup {
            id: MakeupId(self.next_id()),
            student_id,
            slot_id,
            date,
            booked_at,
        };
        self.makeups.insert(makeup.id, makeup.clone());
        Ok(makeup)
    }

    pub fn makeup(&self, id: MakeupId) -> Option<&ScheduledMakeup> {
        self.makeups.get(&id)
    }

    pub fn remove_makeup(&mut self, id: MakeupId) -> Result<ScheduledMakeup, ScheduleError> {
        let makeup = self
            .makeups
            .remove(&id)
            .ok_or(ScheduleError::not_found("makeup booking"))?;
        self.makeup_index
            .remove(&(makeup.student_id, makeup.slot_id, makeup.date));
        Ok(makeup)
    }

    pub fn has_makeup(&self, student_id: StudentId, slot_id: SlotId, date: NaiveDate) -> bool {
        self.makeup_index.contains(&(student_id, slot_id, date))
    }

    pub fn makeups_of_student(&self, student_id: StudentId) -> Vec<&ScheduledMakeup> {
        let mut found: Vec<&ScheduledMakeup> = self
            .makeups
            .values()
            .filter(|m| m.student_id == student_id)
            .collect();
        found.sort_by_key(|m| (m.date, m.id));
        found
    }

    pub fn makeup_count_on(&self, slot_id: SlotId, date: NaiveDate) -> u32 {
        self.makeups
            .values()
            .filter(|m| m.slot_id == slot_id && m.date == date)
            .count() as u32
    }

    // --- activity log ---

    pub fn record_activity(
        &mut self,
        kind: ActivityKind,
        student_id: StudentId,
        slot_id: SlotId,
        timestamp: DateTime<FixedOffset>,
    ) -> ActivityRecord {
        let record = ActivityRecord {
            id: self.next_id(),
            kind,
            student_id,
            slot_id,
            timestamp,
        };
        self.activity.push(record.clone());
        record
    }

    /// Activity entries newest-first, optionally filtered. Date bounds are
    /// inclusive and compared against the record's workshop-local date, so the
    /// extremes of `NaiveDate` are ordinary values here.
    pub fn activity(
        &self,
        student_id: Option<StudentId>,
        kind: Option<ActivityKind>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        limit: usize,
    ) -> Vec<ActivityRecord> {
        self.activity
            .iter()
            .rev()
            .filter(|record| student_id.map_or(true, |id| record.student_id == id))
            .filter(|record| kind.map_or(true, |k| record.kind == k))
            .filter(|record| from.map_or(true, |day| record.timestamp.date_naive() >= day))
            .filter(|record| to.map_or(true, |day| record.timestamp.date_naive() <= day))
            .take(limit)
            .cloned()
            .collect()
    }
}
