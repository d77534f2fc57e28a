use chrono::NaiveDate;

use super::domain::Slot;
use super::store::ScheduleData;

/// Seats left in `slot` on `date`.
///
/// A standing enrollment occupies its seat on every occurrence except dates
/// it has a scheduled absence for (freeing the seat that day only); a makeup
/// booking consumes a seat on its date without touching the standing count.
/// The result can go negative when an administrator cuts `max_capacity`
/// below the current standing count; nobody is evicted, but callers must
/// refuse new bookings while the value is zero or below.
pub fn seats_available(data: &ScheduleData, slot: &Slot, date: NaiveDate) -> i64 {
    i64::from(slot.max_capacity) - i64::from(data.active_enrollment_count(slot.id))
        + i64::from(data.absence_count_on(slot.id, date))
        - i64::from(data.makeup_count_on(slot.id, date))
}

/// Date-independent seat summary for slot listings: seats held by standing
/// enrollments, ignoring per-date exceptions.
pub fn standing_occupancy(data: &ScheduleData, slot: &Slot) -> (u32, i64) {
    let occupied = data.active_enrollment_count(slot.id);
    let available = i64::from(slot.max_capacity) - i64::from(occupied);
    (occupied, available)
}
