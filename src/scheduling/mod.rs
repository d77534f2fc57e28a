//! Weekly class scheduling engine: occurrence projection, per-date seat
//! accounting, the enrollment and makeup lifecycles, and the activity log.
//!
//! Slots recur weekly and are never materialized as stored sessions; concrete
//! dates are projected on demand from a slot's weekday, the calendar of
//! no-class days, and the injected clock. All state lives in one
//! [`store::ScheduleStore`], whose lock scope is the transaction boundary for
//! every lifecycle operation.

pub mod capacity;
pub mod clock;
pub mod domain;
pub mod error;
pub mod occurrences;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use clock::{workshop_offset, Clock, FixedClock, WorkshopClock};
pub use domain::{
    day_name, ActivityKind, ActivityRecord, Enrollment, EnrollmentId, MakeupId, NoClassDay,
    ScheduledAbsence, ScheduledMakeup, Slot, SlotId, SlotSpec, Student, StudentId,
};
pub use error::ScheduleError;
pub use occurrences::{OccurrenceCutoff, HORIZON_MONTHS};
pub use router::schedule_router;
pub use service::{
    ActivityQuery, CancelTarget, EnrollmentView, MakeupOutcome, OccurrenceSeats,
    ScheduleService, SlotSummary, SlotUpdate, StudentOverview, MAX_CANCEL_COUNT,
    MIN_CANCEL_COUNT,
};
pub use store::ScheduleStore;
