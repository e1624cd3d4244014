//! Conversion between the civil zone the user thinks in and the UTC storage
//! zone every stored instant and comparison uses.

use chrono::{
    DateTime, Datelike, DurationRound, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeDelta, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

use crate::error::TimestampError;

pub const DEFAULT_CIVIL_ZONE: Tz = chrono_tz::America::New_York;

/// Accepted layouts for timestamps without an offset. These are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneNormalizer {
    civil: Tz,
}

impl Default for TimeZoneNormalizer {
    fn default() -> Self {
        TimeZoneNormalizer::new(DEFAULT_CIVIL_ZONE)
    }
}

impl TimeZoneNormalizer {
    pub fn new(civil: Tz) -> Self {
        TimeZoneNormalizer { civil }
    }

    pub fn civil_zone(&self) -> Tz {
        self.civil
    }

    /// Civil instant to storage zone, truncated to the minute.
    pub fn to_storage_zone(&self, civil: DateTime<Tz>) -> DateTime<Utc> {
        truncate_to_minute(civil.with_timezone(&Utc))
    }

    /// Storage instant to civil zone, truncated to the minute.
    pub fn to_civil_zone(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        truncate_to_minute(instant).with_timezone(&self.civil)
    }

    /// Resolve a civil wall-clock reading to an instant.
    ///
    /// Ambiguous readings (DST fall-back) take the earlier instant. Readings
    /// inside a DST gap keep the offset in force before the gap, which lands
    /// them just past it.
    pub fn from_wall_clock(&self, local: NaiveDateTime) -> DateTime<Tz> {
        match self.civil.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                let offset = self.civil.offset_from_utc_datetime(&local).fix();
                let utc = (local - offset).and_utc();
                utc.with_timezone(&self.civil)
            }
        }
    }

    /// Parse a timestamp string into a storage-zone instant.
    ///
    /// RFC 3339 strings keep their offset; bare date-times are read as UTC.
    pub fn parse_instant(&self, input: &str) -> Result<DateTime<Utc>, TimestampError> {
        let trimmed = input.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(truncate_to_minute(dt.with_timezone(&Utc)));
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .map(|naive| truncate_to_minute(naive.and_utc()))
            .ok_or_else(|| TimestampError {
                input: input.to_string(),
            })
    }

    pub fn civil_time(&self, instant: DateTime<Utc>) -> NaiveTime {
        self.to_civil_zone(instant).time()
    }

    pub fn civil_weekday(&self, instant: DateTime<Utc>) -> Weekday {
        self.to_civil_zone(instant).weekday()
    }

    pub fn civil_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_civil_zone(instant).date_naive()
    }
}

/// Storage-zone rendering used in prompts and reports.
pub fn format_storage(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Civil-zone rendering with its UTC offset.
pub fn format_civil(instant: DateTime<Tz>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::minutes(1))
        .unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn storage_civil_round_trip_is_identity() {
        let tz = TimeZoneNormalizer::default();
        // Includes both sides of the 2025 DST transitions.
        let instants = [
            utc(2025, 1, 15, 12, 0),
            utc(2025, 3, 9, 6, 59),
            utc(2025, 3, 9, 7, 0),
            utc(2025, 11, 2, 5, 30),
            utc(2025, 11, 2, 6, 30),
            utc(2025, 7, 4, 23, 45),
        ];

        for instant in instants {
            assert_eq!(tz.to_storage_zone(tz.to_civil_zone(instant)), instant);
        }
    }

    #[test]
    fn round_trip_drops_seconds() {
        let tz = TimeZoneNormalizer::default();
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 10, 15, 42).unwrap();
        assert_eq!(
            tz.to_storage_zone(tz.to_civil_zone(instant)),
            utc(2025, 6, 1, 10, 15)
        );
    }

    #[test]
    fn civil_time_follows_daylight_saving() {
        let tz = TimeZoneNormalizer::default();
        // EST in January (UTC-5), EDT in July (UTC-4).
        assert_eq!(
            tz.civil_time(utc(2025, 1, 15, 14, 0)),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(
            tz.civil_time(utc(2025, 7, 15, 14, 0)),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
    }

    #[test]
    fn wall_clock_handles_gap_and_ambiguity() {
        let tz = TimeZoneNormalizer::default();

        // 02:30 does not exist on 2025-03-09.
        let gap = NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let resolved = tz.to_storage_zone(tz.from_wall_clock(gap));
        assert_eq!(resolved, utc(2025, 3, 9, 7, 30));

        // 01:30 happens twice on 2025-11-02; the earlier one is EDT.
        let ambiguous = NaiveDate::from_ymd_opt(2025, 11, 2)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        assert_eq!(
            tz.to_storage_zone(tz.from_wall_clock(ambiguous)),
            utc(2025, 11, 2, 5, 30)
        );
    }

    #[test]
    fn parse_instant_accepts_offsets_and_bare_times() {
        let tz = TimeZoneNormalizer::default();

        assert_eq!(
            tz.parse_instant("2025-07-03T17:30:00Z").unwrap(),
            utc(2025, 7, 3, 17, 30)
        );
        assert_eq!(
            tz.parse_instant("2025-07-03T13:30:00-04:00").unwrap(),
            utc(2025, 7, 3, 17, 30)
        );
        assert_eq!(
            tz.parse_instant("2025-07-03T17:30").unwrap(),
            utc(2025, 7, 3, 17, 30)
        );
        assert_eq!(
            tz.parse_instant("2025-07-03 17:30:59").unwrap(),
            utc(2025, 7, 3, 17, 30)
        );
    }

    #[test]
    fn parse_instant_rejects_garbage() {
        let tz = TimeZoneNormalizer::default();

        for input in ["", "tomorrow", "2025-13-01T10:00", "2025-07-03", "17:30"] {
            let err = tz.parse_instant(input).unwrap_err();
            assert_eq!(err.input, input);
        }
    }
}
