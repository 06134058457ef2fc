//! Wall-clock time and calendar helpers
//!
//! Timestamps are Unix milliseconds (`f64`, as `Date.now()` returns them).
//! Calendar math and ISO-8601 parsing go through chrono; the browser's own
//! `Date` is only asked for local wall-clock fields.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const MS_PER_SECOND: f64 = 1000.0;
pub const MS_PER_DAY: f64 = 86_400_000.0;

/// Date-time layouts accepted without an offset (read as UTC)
const NAIVE_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Current time in Unix milliseconds
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// A calendar date (no time zone attached)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CivilDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl From<NaiveDate> for CivilDate {
    fn from(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month(), date.day())
    }
}

impl CivilDate {
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// chrono view of this date; an out-of-range day rolls into the next
    /// month the way `new Date(y, m, d)` does
    fn naive(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month.clamp(1, 12), 1)
            .and_then(|first| first.checked_add_days(Days::new(u64::from(self.day.max(1) - 1))))
            .unwrap_or_default()
    }

    /// Days since 1970-01-01
    pub fn to_days(self) -> i64 {
        self.naive()
            .signed_duration_since(NaiveDate::default())
            .num_days()
    }

    /// Inverse of [`CivilDate::to_days`]
    pub fn from_days(days: i64) -> Self {
        let epoch = NaiveDate::default();
        let date = if days >= 0 {
            epoch.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            epoch.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        date.unwrap_or(epoch).into()
    }

    /// UTC calendar date of a Unix millisecond timestamp
    pub fn from_ms_utc(ms: f64) -> Self {
        Self::from_days((ms / MS_PER_DAY).floor() as i64)
    }

    /// Parse the `YYYY-MM-DD` prefix of an ISO-8601 string
    ///
    /// Offsets after the date part are ignored, so `2024-03-01T23:30:00+08:00`
    /// yields 2024-03-01. Impossible dates are rejected.
    pub fn parse_iso(s: &str) -> Option<Self> {
        let date_part = s.trim().split(['T', ' ']).next()?;
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .ok()
            .map(Self::from)
    }

    /// Day of week, 0 = Sunday
    pub fn weekday(self) -> u32 {
        self.naive().weekday().num_days_from_sunday()
    }

    /// `Date.prototype.toDateString` layout, e.g. `Thu Aug 01 2024`
    pub fn date_string(self) -> String {
        self.naive().format("%a %b %d %Y").to_string()
    }

    /// Midnight UTC of this date in Unix milliseconds
    pub fn to_ms_utc(self) -> f64 {
        self.to_days() as f64 * MS_PER_DAY
    }

    pub fn add_days(self, n: i64) -> Self {
        Self::from_days(self.to_days() + n)
    }

    /// Whole days from `self` to `other` (negative if `other` is earlier)
    pub fn days_until(self, other: CivilDate) -> i64 {
        other.to_days() - self.to_days()
    }

    /// `YYYY-MM-DD`
    pub fn iso(self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// `YYYY-MM`
    pub fn iso_month(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Short Chinese label, e.g. `8月1日`
    pub fn zh_month_day(self) -> String {
        format!("{}月{}日", self.month, self.day)
    }

    /// Numeric locale-style label, e.g. `2024/8/1`
    pub fn slash(self) -> String {
        format!("{}/{}/{}", self.year, self.month, self.day)
    }
}

/// Parse an ISO-8601 date or date-time into Unix milliseconds
///
/// Accepts RFC 3339 with a `Z` or `±HH:MM` offset, a date-time without an
/// offset (read as UTC), or a bare `YYYY-MM-DD`.
pub fn parse_timestamp_ms(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis() as f64);
    }
    if let Some(dt) = NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
    {
        return Some(dt.and_utc().timestamp_millis() as f64);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|date| CivilDate::from(date).to_ms_utc())
}

/// Local calendar date of a timestamp
#[cfg(target_arch = "wasm32")]
pub fn local_date(ms: f64) -> CivilDate {
    let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(ms));
    CivilDate::new(
        date.get_full_year() as i32,
        date.get_month() + 1,
        date.get_date(),
    )
}

/// Native builds run headless and report UTC
#[cfg(not(target_arch = "wasm32"))]
pub fn local_date(ms: f64) -> CivilDate {
    CivilDate::from_ms_utc(ms)
}

/// Local `HH:MM:SS` for log lines
#[cfg(target_arch = "wasm32")]
pub fn format_clock(ms: f64) -> String {
    let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(ms));
    format!(
        "{:02}:{:02}:{:02}",
        date.get_hours(),
        date.get_minutes(),
        date.get_seconds()
    )
}

#[cfg(not(target_arch = "wasm32"))]
pub fn format_clock(ms: f64) -> String {
    DateTime::<chrono::Utc>::from_timestamp_millis(ms.floor() as i64)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "00:00:00".to_string())
}

/// Local date and time, e.g. `2024/8/1 09:05:03`
pub fn format_date_time(ms: f64) -> String {
    format!("{} {}", local_date(ms).slash(), format_clock(ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_string_and_weekday() {
        let d = CivilDate::new(2024, 8, 1);
        assert_eq!(d.weekday(), 4);
        assert_eq!(d.date_string(), "Thu Aug 01 2024");
        assert_eq!(CivilDate::new(2023, 12, 31).weekday(), 0);
    }

    #[test]
    fn test_parse_timestamp_ms() {
        let midnight = CivilDate::new(2024, 8, 1).to_ms_utc();
        assert_eq!(parse_timestamp_ms("2024-08-01"), Some(midnight));
        assert_eq!(
            parse_timestamp_ms("2024-08-01T10:30:00.000Z"),
            Some(midnight + 37_800_000.0)
        );
        assert_eq!(
            parse_timestamp_ms("2024-08-01 10:30:00"),
            Some(midnight + 37_800_000.0)
        );
        assert_eq!(
            parse_timestamp_ms("2024-08-01T10:30"),
            Some(midnight + 37_800_000.0)
        );
        // 01:00 at +08:00 is the previous UTC day
        let early = parse_timestamp_ms("2024-08-01T01:00:00+08:00").unwrap();
        assert_eq!(CivilDate::from_ms_utc(early), CivilDate::new(2024, 7, 31));
        assert_eq!(parse_timestamp_ms("yesterday"), None);
    }

    #[test]
    fn test_impossible_dates_are_rejected() {
        assert_eq!(parse_timestamp_ms("2024-02-31"), None);
        assert_eq!(parse_timestamp_ms("2023-02-29T08:00:00Z"), None);
        assert_eq!(parse_timestamp_ms("2024-04-31 12:00:00"), None);
        assert_eq!(CivilDate::parse_iso("2024-02-30T00:00:00Z"), None);
        assert!(parse_timestamp_ms("2024-02-29").is_some());
    }

    #[test]
    fn test_epoch_round_trip() {
        assert_eq!(CivilDate::new(1970, 1, 1).to_days(), 0);
        assert_eq!(CivilDate::from_days(0), CivilDate::new(1970, 1, 1));
        assert_eq!(CivilDate::from_days(-1), CivilDate::new(1969, 12, 31));
        let d = CivilDate::new(2024, 2, 29);
        assert_eq!(CivilDate::from_days(d.to_days()), d);
    }

    #[test]
    fn test_add_days_crosses_months_and_leap_years() {
        assert_eq!(
            CivilDate::new(2024, 2, 28).add_days(1),
            CivilDate::new(2024, 2, 29)
        );
        assert_eq!(
            CivilDate::new(2023, 12, 31).add_days(1),
            CivilDate::new(2024, 1, 1)
        );
        assert_eq!(
            CivilDate::new(2023, 8, 1).days_until(CivilDate::new(2023, 9, 1)),
            31
        );
    }

    #[test]
    fn test_parse_iso() {
        assert_eq!(
            CivilDate::parse_iso("2023-08-01T10:00:00.000Z"),
            Some(CivilDate::new(2023, 8, 1))
        );
        assert_eq!(
            CivilDate::parse_iso("2024-03-01 12:00:00"),
            Some(CivilDate::new(2024, 3, 1))
        );
        assert_eq!(CivilDate::parse_iso("yesterday"), None);
        assert_eq!(CivilDate::parse_iso("2024-13-01"), None);
    }

    #[test]
    fn test_formatting() {
        let d = CivilDate::new(2024, 8, 1);
        assert_eq!(d.iso(), "2024-08-01");
        assert_eq!(d.iso_month(), "2024-08");
        assert_eq!(d.zh_month_day(), "8月1日");
        assert_eq!(format_clock(3_723_000.0), "01:02:03");
        assert_eq!(
            format_date_time(d.to_ms_utc() + 32_703_000.0),
            "2024/8/1 09:05:03"
        );
    }
}
