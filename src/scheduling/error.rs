use chrono::NaiveDate;

/// Caller-facing failures raised by the scheduling lifecycles.
///
/// Every variant is a recoverable condition the API layer translates to an
/// HTTP status; nothing here represents an infrastructure fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{field} out of range: {detail}")]
    InvalidRange { field: &'static str, detail: String },
    #[error("date {0} has already passed")]
    PastDate(NaiveDate),
    #[error("slot is not active")]
    SlotInactive,
    #[error("enrollment is no longer active")]
    InactiveEnrollment,
    #[error("student is already enrolled in this slot")]
    DuplicateEnrollment,
    #[error("date {0} is already cancelled")]
    AlreadyCancelled(NaiveDate),
    #[error("a makeup is already booked for that date")]
    AlreadyBooked,
    #[error("the standing enrollment already covers that date")]
    AlreadyEnrolled,
    #[error("no seats available")]
    CapacityExceeded,
    #[error("no makeup credits available")]
    NoCredit,
}

impl ScheduleError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn invalid_range(field: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidRange {
            field,
            detail: detail.into(),
        }
    }
}
