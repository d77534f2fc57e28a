use chrono::{DateTime, Duration, FixedOffset, Months, NaiveDate};

use super::domain::{day_of_week_of, EnrollmentId, Slot};
use super::store::ScheduleData;

/// How far ahead the generator searches before giving up. The bound
/// guarantees termination even when every candidate date is a holiday.
pub const HORIZON_MONTHS: u32 = 3;

/// Which time-of-day boundary retires "today" as a candidate occurrence.
///
/// A session stays joinable until it starts, but remains cancellable/editable
/// until it ends; listing and lifecycle contexts therefore cut over at
/// different times on the slot's own weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceCutoff {
    /// Today no longer counts once the session has started. Used for
    /// availability listings and makeup booking.
    SessionStart,
    /// Today no longer counts once the session has ended. Used for
    /// cancellation eligibility.
    SessionEnd,
}

impl OccurrenceCutoff {
    fn time(self, slot: &Slot) -> chrono::NaiveTime {
        match self {
            OccurrenceCutoff::SessionStart => slot.start_time,
            OccurrenceCutoff::SessionEnd => slot.end_time,
        }
    }
}

/// Next concrete dates on which `slot` meets, ascending, starting from `now`.
///
/// Skips no-class days and, when `excluded_enrollment` is given, dates that
/// enrollment has already cancelled. Returns fewer than `count` dates when
/// the horizon runs out first; never errors. Each call recomputes from the
/// supplied reference instant.
pub fn next_occurrences(
    data: &ScheduleData,
    slot: &Slot,
    excluded_enrollment: Option<EnrollmentId>,
    now: DateTime<FixedOffset>,
    count: usize,
    cutoff: OccurrenceCutoff,
) -> Vec<NaiveDate> {
    let today = now.date_naive();
    let offset =
        (i32::from(slot.day_of_week) - i32::from(day_of_week_of(today))).rem_euclid(7);
    let mut candidate = today + Duration::days(i64::from(offset));

    // Today is the slot's weekday, but the session is over for the purposes
    // of this query; the next occurrence is a week out.
    if offset == 0 && now.time() >= cutoff.time(slot) {
        candidate += Duration::days(7);
    }

    let horizon = today
        .checked_add_months(Months::new(HORIZON_MONTHS))
        .unwrap_or(NaiveDate::MAX);

    let mut dates = Vec::with_capacity(count);
    while dates.len() < count && candidate <= horizon {
        let cancelled = excluded_enrollment
            .map_or(false, |enrollment| data.has_absence(enrollment, candidate));
        if !data.is_no_class_day(candidate) && !cancelled {
            dates.push(candidate);
        }
        candidate += Duration::days(7);
    }
    dates
}

/// Whether `date` is a day this slot actually meets: the right weekday and
/// not a no-class day. Says nothing about seats or past/future.
pub fn is_occurrence(data: &ScheduleData, slot: &Slot, date: NaiveDate) -> bool {
    day_of_week_of(date) == slot.day_of_week && !data.is_no_class_day(date)
}
