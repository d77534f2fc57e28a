use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::scheduling::clock::{Clock, FixedClock};
use crate::scheduling::domain::{day_of_week_of, SlotSpec};
use crate::scheduling::occurrences::{next_occurrences, OccurrenceCutoff, HORIZON_MONTHS};
use crate::scheduling::service::CancelTarget;
use crate::scheduling::store::ScheduleStore;

#[test]
fn occurrences_fall_on_the_slot_weekday_seven_days_apart() {
    let service = service();
    let slot = monday_slot(&service, 5);

    let dates = service
        .list_upcoming_occurrences(slot.id, None, Some(4))
        .expect("slot exists");

    assert_eq!(dates.len(), 4);
    assert_eq!(dates[0], next_monday());
    for date in &dates {
        assert_eq!(day_of_week_of(*date), 1);
    }
    for pair in dates.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::days(7));
    }
}

#[test]
fn same_day_counts_until_the_session_starts() {
    // Monday 08:00, one hour before the 09:00 session.
    let service = service_at(FixedClock::at(next_monday(), time(8, 0)));
    let slot = monday_slot(&service, 5);

    let dates = service
        .list_upcoming_occurrences(slot.id, None, Some(1))
        .expect("slot exists");
    assert_eq!(dates, vec![next_monday()]);
}

#[test]
fn same_day_is_skipped_once_the_session_has_started() {
    // Monday 09:30, mid-session. Listings no longer offer today.
    let service = service_at(FixedClock::at(next_monday(), time(9, 30)));
    let slot = monday_slot(&service, 5);

    let dates = service
        .list_upcoming_occurrences(slot.id, None, Some(1))
        .expect("slot exists");
    assert_eq!(dates, vec![date(2025, 7, 7)]);
}

#[test]
fn cancellation_cutoff_keeps_today_until_the_session_ends() {
    // Monday 09:30: the session has started but not ended, so the
    // cancellation view still includes today while the listing view does not.
    let now = FixedClock::at(next_monday(), time(9, 30)).now_local();
    let store = Arc::new(ScheduleStore::new());
    let slot = store
        .transaction(|data| {
            Ok(data.insert_slot(SlotSpec {
                day_of_week: 1,
                start_time: time(9, 0),
                end_time: time(10, 0),
                max_capacity: 5,
            }))
        })
        .expect("slot registers");

    let (listing, cancelling) = store.read(|data| {
        (
            next_occurrences(data, &slot, None, now, 1, OccurrenceCutoff::SessionStart),
            next_occurrences(data, &slot, None, now, 1, OccurrenceCutoff::SessionEnd),
        )
    });

    assert_eq!(listing, vec![date(2025, 7, 7)]);
    assert_eq!(cancelling, vec![next_monday()]);
}

#[test]
fn session_end_never_returns_today_after_the_session() {
    let now = FixedClock::at(next_monday(), time(10, 0)).now_local();
    let store = Arc::new(ScheduleStore::new());
    let slot = store
        .transaction(|data| {
            Ok(data.insert_slot(SlotSpec {
                day_of_week: 1,
                start_time: time(9, 0),
                end_time: time(10, 0),
                max_capacity: 5,
            }))
        })
        .expect("slot registers");

    let dates =
        store.read(|data| next_occurrences(data, &slot, None, now, 1, OccurrenceCutoff::SessionEnd));
    assert_eq!(dates, vec![date(2025, 7, 7)]);
}

#[test]
fn no_class_day_is_skipped_and_the_count_still_honored() {
    // 2025-12-25 falls on a Thursday.
    let service = service_at(FixedClock::at(date(2025, 12, 16), time(8, 0)));
    let thursday = service
        .register_slot(SlotSpec {
            day_of_week: 4,
            start_time: time(9, 0),
            end_time: time(10, 0),
            max_capacity: 5,
        })
        .expect("slot registers");
    service
        .add_no_class_day(date(2025, 12, 25), Some("holiday".to_string()))
        .expect("holiday added");

    let dates = service
        .list_upcoming_occurrences(thursday.id, None, Some(3))
        .expect("slot exists");

    assert_eq!(
        dates,
        vec![date(2025, 12, 18), date(2026, 1, 1), date(2026, 1, 8)]
    );
    assert!(!dates.contains(&date(2025, 12, 25)));
}

#[test]
fn adjacent_weeks_are_untouched_by_a_no_class_day() {
    let service = service_at(FixedClock::at(date(2025, 12, 16), time(8, 0)));
    let slot = monday_slot(&service, 5);
    service
        .add_no_class_day(date(2025, 12, 25), None)
        .expect("holiday added");

    let dates = service
        .list_upcoming_occurrences(slot.id, None, Some(3))
        .expect("slot exists");
    assert!(dates.contains(&date(2025, 12, 22)));
    assert!(dates.contains(&date(2025, 12, 29)));
}

#[test]
fn horizon_bounds_the_search() {
    let service = service();
    let slot = monday_slot(&service, 5);

    let dates = service
        .list_upcoming_occurrences(slot.id, None, Some(30))
        .expect("slot exists");

    let today = tuesday_morning().now_local().date_naive();
    let horizon = today
        .checked_add_months(chrono::Months::new(HORIZON_MONTHS))
        .expect("horizon computes");
    assert!(dates.len() < 30, "three months hold at most ~14 Mondays");
    assert!(dates.iter().all(|d| *d <= horizon && *d >= today));
}

#[test]
fn excluded_enrollment_absences_are_not_offered() {
    let service = service();
    let slot = monday_slot(&service, 5);
    let alice = student(&service, "Alice");
    let enrollment = service.enroll(alice.id, slot.id).expect("enrollment succeeds");
    service
        .cancel_upcoming(enrollment.id, CancelTarget::Date(next_monday()))
        .expect("cancellation succeeds");

    let own_view = service
        .list_upcoming_occurrences(slot.id, Some(enrollment.id), Some(3))
        .expect("slot exists");
    let public_view = service
        .list_upcoming_occurrences(slot.id, None, Some(3))
        .expect("slot exists");

    assert_eq!(own_view[0], date(2025, 7, 7));
    assert_eq!(public_view[0], next_monday());
}
