use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

/// Seconds west of UTC for the workshop's timezone (UTC−3, no DST).
const WORKSHOP_OFFSET_SECONDS: i32 = 3 * 3600;

/// The workshop's fixed UTC−3 offset.
pub fn workshop_offset() -> FixedOffset {
    FixedOffset::west_opt(WORKSHOP_OFFSET_SECONDS).expect("UTC-3 is a valid offset")
}

/// Source of "now" for every date decision in the engine.
///
/// All comparisons against session times use the workshop's local timezone,
/// never the host's. Injecting the clock keeps those decisions deterministic
/// under test.
pub trait Clock: Send + Sync {
    /// Current instant in the workshop's timezone.
    fn now_local(&self) -> DateTime<FixedOffset>;
}

/// Production clock: system time shifted into the workshop's timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkshopClock;

impl Clock for WorkshopClock {
    fn now_local(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&workshop_offset())
    }
}

/// Deterministic clock pinned to a single instant, for tests and demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self { instant }
    }

    /// Pin the clock to a local date and time in the workshop's timezone.
    pub fn at(date: NaiveDate, time: NaiveTime) -> Self {
        let instant = date
            .and_time(time)
            .and_local_timezone(workshop_offset())
            .single()
            .expect("fixed offsets map local times uniquely");
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now_local(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}
