use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::config::DEFAULT_CUTOVER_HOUR;

/// Cache partition: the local date on which the current window opened.
pub type WindowKey = NaiveDate;

/// Daily cutover in Central European time (UTC+1, UTC+2 during summer time).
///
/// Summer time runs from 01:00 UTC on the last Sunday of March until 01:00 UTC
/// on the last Sunday of October.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoverClock {
    cutover_hour: u32,
}

impl Default for CutoverClock {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOVER_HOUR)
    }
}

impl CutoverClock {
    /// Clock with the given local cutover hour, clamped to 0..=23.
    pub fn new(cutover_hour: u32) -> Self {
        Self {
            cutover_hour: cutover_hour.min(23),
        }
    }

    /// Local cutover hour.
    pub fn cutover_hour(&self) -> u32 {
        self.cutover_hour
    }

    /// Hours ahead of UTC in effect at `instant`.
    pub fn utc_offset_hours(&self, instant: DateTime<Utc>) -> i64 {
        let year = instant.year();
        match (last_sunday_at_one_utc(year, 3), last_sunday_at_one_utc(year, 10)) {
            (Some(start), Some(end)) if instant >= start && instant < end => 2,
            _ => 1,
        }
    }

    /// Local wall-clock time at `instant`.
    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.naive_utc() + Duration::hours(self.utc_offset_hours(instant))
    }

    /// Window containing `now`: today once the cutover has passed, else yesterday.
    pub fn window_key(&self, now: DateTime<Utc>) -> WindowKey {
        let local = self.local(now);
        let today = local.date();
        if local.hour() >= self.cutover_hour {
            today
        } else {
            self.previous(today)
        }
    }

    /// Window immediately before `key`.
    pub fn previous(&self, key: WindowKey) -> WindowKey {
        key.pred_opt().unwrap_or(key)
    }

    /// Instant at which the window keyed `key` opened.
    pub fn window_start(&self, key: WindowKey) -> DateTime<Utc> {
        let local = key.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.cutover_hour));
        // Offsets only change around 01:00 UTC, so one correction step settles.
        let guess = (local - Duration::hours(self.utc_offset_hours(local.and_utc()))).and_utc();
        (local - Duration::hours(self.utc_offset_hours(guess))).and_utc()
    }

    /// Most recent cutover at or before `now`.
    pub fn last_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.window_start(self.window_key(now))
    }
}

fn last_sunday_at_one_utc(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let last_day = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    let sunday = last_day - Duration::days(i64::from(last_day.weekday().num_days_from_sunday()));
    Some((sunday.and_time(NaiveTime::MIN) + Duration::hours(1)).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn offset_follows_summer_time() {
        let clock = CutoverClock::default();
        // 2024: summer time from 31 March to 27 October.
        assert_eq!(clock.utc_offset_hours(utc(2024, 1, 15, 12, 0, 0)), 1);
        assert_eq!(clock.utc_offset_hours(utc(2024, 3, 31, 0, 59, 59)), 1);
        assert_eq!(clock.utc_offset_hours(utc(2024, 3, 31, 1, 0, 0)), 2);
        assert_eq!(clock.utc_offset_hours(utc(2024, 7, 1, 12, 0, 0)), 2);
        assert_eq!(clock.utc_offset_hours(utc(2024, 10, 27, 0, 59, 59)), 2);
        assert_eq!(clock.utc_offset_hours(utc(2024, 10, 27, 1, 0, 0)), 1);
    }

    #[test]
    fn key_changes_exactly_at_local_cutover() {
        let clock = CutoverClock::default();
        // Winter: 20:00 local = 19:00 UTC.
        assert_eq!(clock.window_key(utc(2024, 1, 10, 18, 59, 59)), date(2024, 1, 9));
        assert_eq!(clock.window_key(utc(2024, 1, 10, 19, 0, 0)), date(2024, 1, 10));
        // Summer: 20:00 local = 18:00 UTC.
        assert_eq!(clock.window_key(utc(2024, 7, 10, 17, 59, 59)), date(2024, 7, 9));
        assert_eq!(clock.window_key(utc(2024, 7, 10, 18, 0, 0)), date(2024, 7, 10));
    }

    #[test]
    fn key_is_shared_within_a_window() {
        let clock = CutoverClock::default();
        let before = [
            utc(2024, 1, 10, 0, 0, 0),
            utc(2024, 1, 10, 8, 30, 0),
            utc(2024, 1, 10, 18, 59, 0),
        ];
        for instant in before {
            assert_eq!(clock.window_key(instant), date(2024, 1, 9));
        }
        // Local 20:00 until local midnight and beyond share the same key.
        for instant in [utc(2024, 1, 10, 19, 30, 0), utc(2024, 1, 10, 23, 30, 0)] {
            assert_eq!(clock.window_key(instant), date(2024, 1, 10));
        }
        assert_eq!(clock.window_key(utc(2024, 1, 11, 18, 0, 0)), date(2024, 1, 10));
    }

    #[test]
    fn one_boundary_per_day_across_summer_time_change() {
        let clock = CutoverClock::default();
        // Clocks moved forward on 2024-03-31; the boundary moves from 19:00 to 18:00 UTC.
        assert_eq!(clock.window_start(date(2024, 3, 30)), utc(2024, 3, 30, 19, 0, 0));
        assert_eq!(clock.window_start(date(2024, 3, 31)), utc(2024, 3, 31, 18, 0, 0));
        assert_eq!(clock.window_key(utc(2024, 3, 31, 17, 59, 0)), date(2024, 3, 30));
        assert_eq!(clock.window_key(utc(2024, 3, 31, 18, 0, 0)), date(2024, 3, 31));
    }

    #[test]
    fn last_boundary_is_not_in_the_future() {
        let clock = CutoverClock::default();
        let now = utc(2024, 1, 10, 12, 0, 0);
        assert_eq!(clock.last_boundary(now), utc(2024, 1, 9, 19, 0, 0));
        let now = utc(2024, 1, 10, 19, 0, 0);
        assert_eq!(clock.last_boundary(now), now);
    }

    #[test]
    fn custom_cutover_hour() {
        let clock = CutoverClock::new(6);
        assert_eq!(clock.window_key(utc(2024, 1, 10, 4, 59, 0)), date(2024, 1, 9));
        assert_eq!(clock.window_key(utc(2024, 1, 10, 5, 0, 0)), date(2024, 1, 10));
        assert_eq!(CutoverClock::new(30).cutover_hour(), 23);
    }
}
