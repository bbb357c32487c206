use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use olivia_common::models::DateWindow;

/// Source of "now". Swapped for a fixed clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Instant at which `day` starts in `tz`. Days that begin inside a DST gap
/// start at the first valid local instant.
pub fn day_start_utc(tz: Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = midnight + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| shifted.and_utc())
        }
    }
}

/// `[start of window.start, start of window.end)` in UTC.
pub fn window_bounds_utc(tz: Tz, window: &DateWindow) -> (DateTime<Utc>, DateTime<Utc>) {
    (day_start_utc(tz, window.start), day_start_utc(tz, window.end))
}

/// Calendar day of an instant as seen in `tz`.
pub fn local_day(tz: Tz, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Monday-based week containing `day`.
pub fn week_of(day: NaiveDate) -> DateWindow {
    let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    DateWindow {
        start: monday,
        end: monday + Duration::days(7),
    }
}
